use thiserror::Error;

/// Which way the call stack ran out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackFault {
    /// A call with all 16 slots in use
    Overflow,
    /// A return with an empty stack
    Underflow,
}

/// Everything that can stop a Chip-8 program.
///
/// All of these are fatal for the current run; the machine has to be rebooted to continue.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("unknown opcode {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryFault { address: usize },

    #[error("stack fault: {0:?}")]
    StackFault(StackFault),

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("unable to read ROM")]
    Io(#[from] std::io::Error),
}
