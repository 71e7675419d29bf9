//! Single-slot transient notifications (toasts).

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Increases with every notification shown, so two identical texts in a
    /// row are still distinguishable by the presentation layer.
    pub seq: u64,
    pub kind: NotificationKind,
    pub message: String,
}

/// At most one notification is visible; showing a new one replaces it.
pub struct Notifier {
    tx: watch::Sender<Option<Notification>>,
    seq: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    pub fn show(&self, kind: NotificationKind, message: impl Into<String>) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.tx.send_replace(Some(Notification {
            seq,
            kind,
            message: message.into(),
        }));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(NotificationKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(NotificationKind::Error, message);
    }

    /// Clear the slot.
    pub fn hide(&self) {
        self.tx.send_if_modified(|slot| slot.take().is_some());
    }

    pub fn current(&self) -> Option<Notification> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
