pub mod constants;
pub mod error;
pub mod frame;

pub use constants::*;
pub use error::{ChannelError, ConnectionFailure, FailureKind, Result};
pub use frame::{EventFrame, now_millis};
