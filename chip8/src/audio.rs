use std::time::{Duration, Instant};

use anyhow::Result;
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

const PITCH: f32 = 440.0;
const VOLUME: f32 = 0.2;
const BEEP_LENGTH: Duration = Duration::from_millis(100);

struct SquareWave {
    phase_inc: f32,
    phase: f32,
}

impl AudioCallback for SquareWave {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = if self.phase <= 0.5 { VOLUME } else { -VOLUME };
            self.phase = (self.phase + self.phase_inc) % 1.0;
        }
    }
}

/// # Beeper
/// A square wave that plays for a fixed length after every `beep`.
pub struct Beeper {
    device: AudioDevice<SquareWave>,
    until: Option<Instant>,
}

impl Beeper {
    pub fn new(sdl: &sdl2::Sdl) -> Result<Self> {
        let audio = sdl.audio().map_err(anyhow::Error::msg)?;
        let desired = AudioSpecDesired {
            freq: Some(44_100),
            channels: Some(1),
            samples: None,
        };
        let device = audio
            .open_playback(None::<&str>, &desired, |spec| SquareWave {
                phase_inc: PITCH / spec.freq as f32,
                phase: 0.0,
            })
            .map_err(anyhow::Error::msg)?;

        Ok(Beeper {
            device,
            until: None,
        })
    }

    pub fn beep(&mut self) {
        self.device.resume();
        self.until = Some(Instant::now() + BEEP_LENGTH);
    }

    /// Silences the tone once it has played long enough
    pub fn update(&mut self) {
        if let Some(until) = self.until {
            if Instant::now() >= until {
                self.device.pause();
                self.until = None;
            }
        }
    }
}
