//! Shared type definitions.

mod email;
mod id;
mod keys;
mod time;

pub use email::{Email, EmailError};
pub use id::{RecordId, RecordIdError};
pub use keys::{hashed_key, keyed_digest};
pub use time::{display_timestamp, now_ms};
