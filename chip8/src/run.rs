use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};
use sdl2::event::Event as SdlEvent;
use sdl2::keyboard::Scancode;
use sdl2::EventPump;

use chip8vm::{Chip8, Config, Event, FrameBuffer, Host};

use crate::audio::Beeper;
use crate::display::Display;
use crate::keymap::keymap;

/// SDL2 window, speaker and keyboard
struct SdlHost {
    display: Display,
    beeper: Option<Beeper>,
    events: EventPump,
    last_cycle: Instant,
}

impl Host for SdlHost {
    fn render(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.display.render(frame)
    }

    fn poll_input(&mut self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for event in self.events.poll_iter() {
            match event {
                SdlEvent::Quit { .. }
                | SdlEvent::KeyDown {
                    scancode: Some(Scancode::Escape),
                    ..
                } => events.push(Event::Quit),
                SdlEvent::KeyDown {
                    scancode: Some(Scancode::Backspace),
                    repeat: false,
                    ..
                } => events.push(Event::Reboot),
                SdlEvent::KeyDown {
                    scancode: Some(key),
                    ..
                } => events.extend(keymap(key).map(Event::KeyDown)),
                SdlEvent::KeyUp {
                    scancode: Some(key),
                    ..
                } => events.extend(keymap(key).map(Event::KeyUp)),
                _ => continue,
            };
        }
        Ok(events)
    }

    fn beep(&mut self) -> Result<()> {
        if let Some(beeper) = self.beeper.as_mut() {
            beeper.beep();
        }
        Ok(())
    }

    fn wait_frame(&mut self, cycle_time: Duration) -> Result<()> {
        if let Some(beeper) = self.beeper.as_mut() {
            beeper.update();
        }

        let elapsed_cycle_time = self.last_cycle.elapsed();
        if cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        self.last_cycle = Instant::now();
        Ok(())
    }
}

/// Opens a window and runs the ROM at `rom` until the window is closed
pub fn run(rom: &Path, scale: u32, seed: Option<u64>, config: &Config) -> Result<()> {
    let mut chip8 = match seed {
        Some(seed) => Chip8::with_seed(seed),
        None => Chip8::new(),
    };

    // Load ROM
    let file = File::open(rom).with_context(|| format!("unable to open {}", rom.display()))?;
    let mut reader = BufReader::new(file);
    chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", rom.display()))?;

    // Get SDL2 context
    let sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let display = Display::new(&sdl, scale)?;
    let beeper = match Beeper::new(&sdl) {
        Ok(beeper) => Some(beeper),
        Err(e) => {
            warn!("no audio, continuing without sound: {}", e);
            None
        }
    };
    let events = sdl.event_pump().map_err(anyhow::Error::msg)?;

    let mut host = SdlHost {
        display,
        beeper,
        events,
        last_cycle: Instant::now(),
    };

    info!("running {}", rom.display());
    chip8vm::run(&mut chip8, &mut host, config)
}
