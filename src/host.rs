use std::time::Duration;

use log::{error, info};

use crate::chip8::Chip8;
use crate::config::Config;
use crate::state::FrameBuffer;

/// Something the host observed since the last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    KeyDown(u8),
    KeyUp(u8),
    /// Start the program over with fresh state
    Reboot,
    /// Stop running altogether
    Quit,
}

/// # Host
/// The platform a Chip-8 runs on: a screen, a speaker, a keypad and a clock.
pub trait Host {
    /// Show a frame; only called when it changed
    fn render(&mut self, frame: &FrameBuffer) -> anyhow::Result<()>;

    /// Drain the input events that arrived since the last poll
    fn poll_input(&mut self) -> anyhow::Result<Vec<Event>>;

    /// Play a short tone; called once each time the sound timer runs out
    fn beep(&mut self) -> anyhow::Result<()>;

    /// Block until the next step is due
    fn wait_frame(&mut self, cycle_time: Duration) -> anyhow::Result<()>;
}

/// Drives a machine on a host until the host asks to quit.
///
/// Each pass applies pending input, steps the machine once, forwards beeps and frames, then waits
/// for the next cycle. A fatal machine error is logged and returned unless
/// `config.reboot_on_fault` is set, in which case the host stays live until a reboot or quit.
pub fn run(chip8: &mut Chip8, host: &mut dyn Host, config: &Config) -> anyhow::Result<()> {
    loop {
        for event in host.poll_input()? {
            match event {
                Event::KeyDown(key) => chip8.key_press(key),
                Event::KeyUp(key) => chip8.key_release(key),
                Event::Reboot => chip8.reboot()?,
                Event::Quit => {
                    info!("quit requested");
                    return Ok(());
                }
            }
        }

        if let Err(fault) = chip8.step() {
            error!("fatal error: {}", fault);
            if !config.reboot_on_fault {
                return Err(fault.into());
            }
        }

        if chip8.take_beep() {
            host.beep()?;
        }

        if let Some(frame) = chip8.take_frame() {
            host.render(frame)?;
        }

        host.wait_frame(config.cycle_time)?;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::chip8::Status;
    use crate::error::Chip8Error;

    /// Plays back one batch of events per frame, then quits
    struct ScriptedHost {
        script: VecDeque<Vec<Event>>,
        frames: Vec<FrameBuffer>,
        beeps: usize,
        waits: usize,
    }

    impl ScriptedHost {
        fn new(script: Vec<Vec<Event>>) -> Self {
            ScriptedHost {
                script: script.into(),
                frames: Vec::new(),
                beeps: 0,
                waits: 0,
            }
        }
    }

    impl Host for ScriptedHost {
        fn render(&mut self, frame: &FrameBuffer) -> anyhow::Result<()> {
            self.frames.push(*frame);
            Ok(())
        }

        fn poll_input(&mut self) -> anyhow::Result<Vec<Event>> {
            Ok(self.script.pop_front().unwrap_or_else(|| vec![Event::Quit]))
        }

        fn beep(&mut self) -> anyhow::Result<()> {
            self.beeps += 1;
            Ok(())
        }

        fn wait_frame(&mut self, _cycle_time: Duration) -> anyhow::Result<()> {
            self.waits += 1;
            Ok(())
        }
    }

    fn boot(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(7);
        chip8.load_program(program.to_vec()).unwrap();
        chip8
    }

    #[test]
    fn test_quits_on_request() {
        let mut chip8 = boot(&[0x12, 0x00]);
        let mut host = ScriptedHost::new(vec![vec![], vec![]]);
        run(&mut chip8, &mut host, &Config::default()).unwrap();
        assert_eq!(host.waits, 2);
        assert_eq!(chip8.status(), Status::HaltedOnSelfLoop);
        // Only the blank screen from booting
        assert_eq!(host.frames.len(), 1);
    }

    #[test]
    fn test_renders_drawn_frames() {
        // I = sprite "0"; draw it at 0, 0; loop forever
        let mut chip8 = boot(&[0xA0, 0x00, 0xD0, 0x05, 0x12, 0x04]);
        let mut host = ScriptedHost::new(vec![vec![], vec![], vec![]]);
        run(&mut chip8, &mut host, &Config::default()).unwrap();
        assert_eq!(host.frames.len(), 2);
        assert_eq!(host.frames[1][0][0..4], [1, 1, 1, 1]);
    }

    #[test]
    fn test_forwards_keys() {
        // wait for a key into V3; loop forever
        let mut chip8 = boot(&[0xF3, 0x0A, 0x12, 0x02]);
        let mut host = ScriptedHost::new(vec![
            vec![],
            vec![],
            vec![Event::KeyDown(0x7)],
            vec![Event::KeyUp(0x7)],
        ]);
        run(&mut chip8, &mut host, &Config::default()).unwrap();
        assert_eq!(chip8.state().v[0x3], 0x7);
        assert!(!chip8.state().is_pressed(0x7));
        assert_eq!(chip8.status(), Status::HaltedOnSelfLoop);
    }

    #[test]
    fn test_forwards_beeps() {
        // V0 = 1; ST = V0; loop forever
        let mut chip8 = boot(&[0x60, 0x01, 0xF0, 0x18, 0x12, 0x04]);
        let mut host = ScriptedHost::new(vec![vec![]; 5]);
        run(&mut chip8, &mut host, &Config::default()).unwrap();
        assert_eq!(host.beeps, 1);
    }

    #[test]
    fn test_returns_fatal_errors() {
        let mut chip8 = boot(&[0xFF, 0xFF]);
        let mut host = ScriptedHost::new(vec![vec![]; 3]);
        let err = run(&mut chip8, &mut host, &Config::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Chip8Error>(),
            Some(Chip8Error::UnknownOpcode { opcode: 0xFFFF })
        ));
        assert_eq!(host.waits, 0);
    }

    #[test]
    fn test_reboot_on_fault_keeps_running() {
        let mut chip8 = boot(&[0xFF, 0xFF]);
        let mut host = ScriptedHost::new(vec![vec![], vec![], vec![Event::Reboot]]);
        let config = Config {
            reboot_on_fault: true,
            ..Config::default()
        };
        run(&mut chip8, &mut host, &config).unwrap();
        assert_eq!(host.waits, 3);
        assert_eq!(chip8.status(), Status::AwaitingReboot);
        // Booting and the reboot each paint a blank screen
        assert_eq!(host.frames.len(), 2);
    }

    #[test]
    fn test_reboot_restarts_program() {
        // V0 += 1; loop forever
        let mut chip8 = boot(&[0x70, 0x01, 0x12, 0x02]);
        let mut host = ScriptedHost::new(vec![vec![], vec![], vec![Event::Reboot]]);
        run(&mut chip8, &mut host, &Config::default()).unwrap();
        assert_eq!(chip8.state().v[0x0], 0x1);
        assert_eq!(chip8.status(), Status::Running);
    }
}
