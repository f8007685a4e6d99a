pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{ResilienceError, Result};
pub use message::SocketMessage;
