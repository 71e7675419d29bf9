pub mod api;
pub mod models;

pub use models::{Message, MessageId, Snapshot, SnapshotFormatError, User, UserId};
