use std::io::Read;

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{MAX_ROM_SIZE, PROGRAM_START};
use crate::error::Chip8Error;
use crate::instruction::from_op;
use crate::operations::Flow;
use crate::state::{FrameBuffer, State};

/// Where the machine is in its run/halt/reboot cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Executing one instruction per step
    Running,
    /// The program jumped to itself; only timers and input are serviced until a reboot
    HaltedOnSelfLoop,
    /// A fatal error ended the program; nothing happens until a reboot
    AwaitingReboot,
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - the loaded `program`, which survives reboots
///  - its `status`
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the CPU and its timers
/// - rebooting
/// - inspecting its frame buffer for rendering by some display
pub struct Chip8 {
    state: State,
    program: Vec<u8>,
    status: Status,
    rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A machine whose random numbers are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Chip8 {
            state: State::new(),
            program: Vec::new(),
            status: Status::Running,
            rng,
        }
    }

    /// Load a rom from a source file and reboot into it
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<(), Chip8Error> {
        let mut program = Vec::new();
        reader.read_to_end(&mut program)?;
        self.load_program(program)
    }

    /// Replace the program and reboot into it
    ///
    /// # Arguments
    /// * `program` raw Chip-8 bytecode, at most `MAX_ROM_SIZE` bytes
    pub fn load_program(&mut self, program: Vec<u8>) -> Result<(), Chip8Error> {
        if program.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max: MAX_ROM_SIZE,
            });
        }
        info!(
            "loaded {} byte program at {:#06X}",
            program.len(),
            PROGRAM_START
        );
        self.program = program;
        self.reboot()
    }

    /// Throws away all state but the program and starts it again from the top
    pub fn reboot(&mut self) -> Result<(), Chip8Error> {
        let mut state = State::new();
        state.load_program(&self.program)?;
        // Have the host paint the blank screen
        state.draw_flag = true;
        self.state = state;
        self.status = Status::Running;
        info!("reboot");
        Ok(())
    }

    /// Advances the machine by a single step
    /// - while running: gets and executes the next opcode, then ticks the timers
    /// - while halted on a self loop: only ticks the timers
    /// - while awaiting a reboot: does nothing
    ///
    /// An error is fatal; the machine waits for a reboot afterwards.
    pub fn step(&mut self) -> Result<Status, Chip8Error> {
        match self.status {
            Status::Running => {}
            Status::HaltedOnSelfLoop => {
                self.state.tick_timers();
                return Ok(self.status);
            }
            Status::AwaitingReboot => return Ok(self.status),
        }

        match self.execute() {
            Ok(Flow::Next) => self.state.tick_timers(),
            Ok(Flow::Wait) => {}
            Ok(Flow::SelfLoop) => {
                info!("program looped at {:#06X}", self.state.pc);
                self.status = Status::HaltedOnSelfLoop;
            }
            Err(e) => {
                debug!("program failed at {:#06X}: {}", self.state.pc, e);
                self.status = Status::AwaitingReboot;
                return Err(e);
            }
        }
        Ok(self.status)
    }

    fn execute(&mut self) -> Result<Flow, Chip8Error> {
        let op = self.state.fetch()?;
        let instruction = from_op(op);
        trace!(
            "pc {:#06X} op {} {:<6} v{:02X?} i{:#06X}",
            self.state.pc,
            op,
            instruction.name,
            self.state.v,
            self.state.i
        );
        (instruction.execute)(op, &mut self.state, &mut self.rng)
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        debug!("key down {:X}", key);
        self.state.key_down(key);
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) {
        debug!("key up {:X}", key);
        self.state.key_up(key);
    }

    /// Returns the FrameBuffer if the display should be redrawn and marks it as drawn
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(&self.state.frame_buffer)
        } else {
            None
        }
    }

    /// Whether the sound timer ran out since the last call
    pub fn take_beep(&mut self) -> bool {
        std::mem::take(&mut self.state.beep_flag)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn state(&self) -> &State {
        &self.state
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackFault;

    fn boot(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(310349960114);
        chip8.load_program(program.to_vec()).unwrap();
        chip8
    }

    #[test]
    fn test_load_rom_from_reader() {
        let mut chip8 = Chip8::new();
        let mut rom: &[u8] = &[0x00, 0xE0, 0x12, 0x02];
        chip8.load_rom(&mut rom).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x204], [0x00, 0xE0, 0x12, 0x02]);
        assert_eq!(chip8.status(), Status::Running);
    }

    #[test]
    fn test_load_rom_rejects_large_roms() {
        let mut chip8 = Chip8::new();
        let rom = vec![0; MAX_ROM_SIZE + 1];
        let result = chip8.load_rom(&mut &rom[..]);
        assert!(matches!(result, Err(Chip8Error::RomTooLarge { .. })));
    }

    #[test]
    fn test_cycles() {
        let mut chip8 = boot(&[0x00, 0xE0]);
        assert_eq!(chip8.step().unwrap(), Status::Running);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_self_loop_halts() {
        let mut chip8 = boot(&[0x12, 0x00]);
        assert_eq!(chip8.step().unwrap(), Status::HaltedOnSelfLoop);
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.step().unwrap(), Status::HaltedOnSelfLoop);
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_halted_machine_keeps_ticking_and_accepting_keys() {
        // V0 = 3; DT = V0; loop forever
        let mut chip8 = boot(&[0x60, 0x03, 0xF0, 0x15, 0x12, 0x04]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 2);
        assert_eq!(chip8.step().unwrap(), Status::HaltedOnSelfLoop);
        assert_eq!(chip8.state.delay_timer, 2);
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 1);
        chip8.key_press(0x5);
        assert!(chip8.state.is_pressed(0x5));
    }

    #[test]
    fn test_reboot_after_self_loop() {
        let mut chip8 = boot(&[0x60, 0x42, 0x12, 0x02]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.status(), Status::HaltedOnSelfLoop);

        chip8.reboot().unwrap();
        assert_eq!(chip8.status(), Status::Running);
        assert_eq!(chip8.state.v[0x0], 0x0);
        assert_eq!(chip8.state.pc, 0x200);
        // The program survives the reboot
        assert_eq!(chip8.state.memory[0x200..0x204], [0x60, 0x42, 0x12, 0x02]);
        assert_eq!(chip8.step().unwrap(), Status::Running);
        assert_eq!(chip8.state.v[0x0], 0x42);
    }

    #[test]
    fn test_reboot_clears_state() {
        let mut chip8 = boot(&[0x00, 0xE0]);
        chip8.state.frame_buffer[3][3] = 1;
        chip8.state.sound_timer = 9;
        chip8.state.push(0x204).unwrap();
        chip8.key_press(0x1);
        chip8.reboot().unwrap();
        assert_eq!(chip8.state.frame_buffer[3][3], 0);
        assert_eq!(chip8.state.sound_timer, 0);
        assert_eq!(chip8.state.sp, 0);
        assert!(!chip8.state.is_pressed(0x1));
        assert!(chip8.take_frame().is_some());
    }

    #[test]
    fn test_unknown_opcode_awaits_reboot() {
        let mut chip8 = boot(&[0xFF, 0xFF]);
        let result = chip8.step();
        assert!(matches!(
            result,
            Err(Chip8Error::UnknownOpcode { opcode: 0xFFFF })
        ));
        assert_eq!(chip8.status(), Status::AwaitingReboot);
        assert_eq!(chip8.step().unwrap(), Status::AwaitingReboot);
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_stack_fault_awaits_reboot() {
        let mut chip8 = boot(&[0x00, 0xEE]);
        assert!(matches!(
            chip8.step(),
            Err(Chip8Error::StackFault(StackFault::Underflow))
        ));
        assert_eq!(chip8.status(), Status::AwaitingReboot);
    }

    #[test]
    fn test_delay_timer_counts_down_per_step() {
        let mut chip8 = boot(&[0x60, 0x00, 0x60, 0x00, 0x60, 0x00]);
        chip8.state.delay_timer = 2;
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 1);
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 0);
        chip8.step().unwrap();
        assert_eq!(chip8.state.delay_timer, 0);
    }

    #[test]
    fn test_sound_timer_beeps_once() {
        // V0 = 2; ST = V0; then idle
        let mut chip8 = boot(&[0x60, 0x02, 0xF0, 0x18, 0x61, 0x00, 0x61, 0x00]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.sound_timer, 1);
        assert!(!chip8.take_beep());
        chip8.step().unwrap();
        assert_eq!(chip8.state.sound_timer, 0);
        assert!(chip8.take_beep());
        assert!(!chip8.take_beep());
        chip8.step().unwrap();
        assert!(!chip8.take_beep());
    }

    #[test]
    fn test_doesnt_cycle_while_waiting_for_key() {
        let mut chip8 = boot(&[0xF1, 0x0A, 0x12, 0x02]);
        chip8.state.delay_timer = 5;
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.delay_timer, 5);

        chip8.key_press(0xE);
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x1], 0xE);
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.delay_timer, 4);
    }

    #[test]
    fn test_take_frame_clears_draw_flag() {
        let mut chip8 = boot(&[0x00, 0xE0, 0x00, 0xE0]);
        assert!(chip8.take_frame().is_some());
        assert!(chip8.take_frame().is_none());
        chip8.step().unwrap();
        assert!(chip8.take_frame().is_some());
        assert!(chip8.take_frame().is_none());
    }

    #[test]
    fn test_seeded_machines_agree() {
        let program = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF];
        let mut a = boot(&program);
        let mut b = boot(&program);
        for _ in 0..3 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.state.v, b.state.v);
    }
}
