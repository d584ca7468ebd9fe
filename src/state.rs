use log::warn;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT, MAX_ROM_SIZE, MEMORY_SIZE, PROGRAM_START,
    REGISTER_COUNT, SPRITE_SHEET, STACK_SIZE,
};
use crate::error::{Chip8Error, StackFault};
use crate::opcode::Opcode;

/// The Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) doubles as the carry/borrow/collision flag but stays an ordinary register
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) index of the next free stack slot
///
/// Timers
/// - 2 8-bit timers (delay & sound), decremented once per executed step
/// - When the sound timer passes through 1 a beep is requested
///
/// ## Memory
/// - 16 slot stack of return addresses
/// - 4096 bytes of addressable memory; the sprite sheet lives at 0x000, programs at 0x200
/// - 32x64 byte frame buffer
///     - stores the contents of the next frame to be drawn
///
/// ## Input
/// - the pressed status of keys 0..F, written only by the host
#[derive(Clone)]
pub struct State {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub sp: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub beep_flag: bool,
    pub keypad: [bool; KEY_COUNT],
}

/// The FrameBuffer is indexed as [y][x]; 0 is off, anything else is on
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[0..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            beep_flag: false,
            keypad: [false; KEY_COUNT],
        }
    }

    /// Copies a program into memory at `PROGRAM_START`
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        if program.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.write_slice(PROGRAM_START, program)
    }

    pub fn read_byte(&self, addr: u16) -> Result<u8, Chip8Error> {
        self.memory
            .get(addr as usize)
            .copied()
            .ok_or(Chip8Error::MemoryFault {
                address: addr as usize,
            })
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Chip8Error> {
        let cell = self
            .memory
            .get_mut(addr as usize)
            .ok_or(Chip8Error::MemoryFault {
                address: addr as usize,
            })?;
        *cell = value;
        Ok(())
    }

    /// Borrows `len` bytes of memory starting at `addr`
    pub fn read_slice(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error> {
        let start = addr as usize;
        self.memory
            .get(start..start + len)
            .ok_or(Chip8Error::MemoryFault {
                address: start.max(MEMORY_SIZE),
            })
    }

    /// Writes all of `bytes` starting at `addr`, or nothing at all if they don't fit
    pub fn write_slice(&mut self, addr: u16, bytes: &[u8]) -> Result<(), Chip8Error> {
        let start = addr as usize;
        let target = self
            .memory
            .get_mut(start..start + bytes.len())
            .ok_or(Chip8Error::MemoryFault {
                address: start.max(MEMORY_SIZE),
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    pub fn fetch(&self) -> Result<Opcode, Chip8Error> {
        let bytes = self.read_slice(self.pc, 2)?;
        Ok(Opcode::from_bytes(bytes[0], bytes[1]))
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Chip8Error> {
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(Chip8Error::StackFault(StackFault::Overflow))?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackFault(StackFault::Underflow));
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Counts both timers down by one.
    /// The sound timer requests a beep as it goes from 1 to 0.
    pub fn tick_timers(&mut self) {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }

        if self.sound_timer > 0 {
            if self.sound_timer == 1 {
                self.beep_flag = true;
            }
            self.sound_timer -= 1;
        }
    }

    pub fn clear_screen(&mut self) {
        self.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        self.draw_flag = true;
    }

    pub fn key_down(&mut self, key: u8) {
        self.set_key(key, true);
    }

    pub fn key_up(&mut self, key: u8) {
        self.set_key(key, false);
    }

    fn set_key(&mut self, key: u8, pressed: bool) {
        match self.keypad.get_mut(key as usize) {
            Some(slot) => *slot = pressed,
            None => warn!("ignoring event for key {:#X} outside of the keypad", key),
        }
    }

    /// Keys outside 0..F are never pressed
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keypad.get(key as usize).copied().unwrap_or(false)
    }

    /// The highest numbered key currently held down
    pub fn last_pressed(&self) -> Option<u8> {
        self.keypad.iter().rposition(|&pressed| pressed).map(|key| key as u8)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
