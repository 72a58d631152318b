//! Incremental poll, trigger match and relay.
//!
//! - `types`: stream position, messages, and the chat-service capabilities
//! - `matcher`: pure trigger-word matching
//! - `cursor`: monotonic "last seen" position
//! - `record`: relay text composition
//! - `poller`: the loop tying them together

pub mod cursor;
pub mod matcher;
pub mod poller;
pub mod record;
pub mod types;

pub use cursor::Cursor;
pub use matcher::{TriggerSet, matches};
pub use poller::{PollOutcome, PollPhase, RelayPoller, spawn_relay_poller};
pub use record::RelayRecord;
pub use types::{ChatMessage, ChatService, Timestamp, UserDirectory, UserProfile};
