pub mod error;
pub mod types;

pub use error::{Result, SyncError};
pub use types::{utf16_len, ActorId, IndexRange, SessionId, TimeTicket};
