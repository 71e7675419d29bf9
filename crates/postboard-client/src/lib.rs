//! Client-side synchronisation for a postboard server.
//!
//! [`Store`] keeps the local copy of users and messages and applies every
//! mutation through a [`Remote`]. [`PollScheduler`] refreshes it in the
//! background, and [`Notifier`] carries the one toast currently on screen.

pub mod config;
pub mod error;
pub mod identity;
pub mod notify;
pub mod poll;
pub mod remote;
pub mod store;
pub mod view;

pub use config::ClientConfig;
pub use error::{ClientError, RemoteError, RemoteErrorKind};
pub use notify::{Notification, NotificationKind, Notifier};
pub use poll::{PollScheduler, PollState, PollTarget, Visibility};
pub use remote::{HttpRemote, Remote};
pub use store::{BoardView, ExportArtifact, LoadState, Store};
