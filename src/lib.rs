pub use chip8::{Chip8, Status};
pub use config::Config;
pub use error::{Chip8Error, StackFault};
pub use host::{run, Event, Host};
pub use state::FrameBuffer;

mod chip8;
mod config;
pub mod constants;
mod error;
mod host;
mod instruction;
mod opcode;
mod operations;
pub mod state;
