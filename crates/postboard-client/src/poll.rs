//! Periodic background refresh, paused while the board is not visible.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::remote::Remote;
use crate::store::Store;

/// Whether the board is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Stopped,
    Running,
}

/// Something refreshed on every tick.
pub trait PollTarget: Send + Sync + 'static {
    fn poll(&self) -> impl Future<Output = ()> + Send;
}

/// Failures are logged and retried on the next tick, never shown to the user.
impl<R: Remote> PollTarget for Store<R> {
    async fn poll(&self) {
        if let Err(err) = self.refresh().await {
            warn!("Background refresh failed: {}", err);
        }
    }
}

struct Shared<T> {
    target: Arc<T>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T: PollTarget> Shared<T> {
    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh now, then once per interval. Any earlier timer is cancelled first.
    fn start(&self) {
        let mut timer = self.timer();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let target = self.target.clone();
        let period = self.interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // a slow refresh pushes the schedule back instead of bursting
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                target.poll().await;
            }
        }));
        debug!("Polling started every {:?}", period);
    }

    fn resume(&self) {
        if self.state() == PollState::Stopped {
            self.start();
        }
    }

    fn stop(&self) {
        if let Some(timer) = self.timer().take() {
            timer.abort();
            debug!("Polling stopped");
        }
    }

    fn state(&self) -> PollState {
        match self.timer().as_ref() {
            Some(timer) if !timer.is_finished() => PollState::Running,
            _ => PollState::Stopped,
        }
    }
}

/// Owns at most one polling timer and, optionally, a task that starts and
/// stops it as visibility changes. Dropping the scheduler cancels both.
pub struct PollScheduler<T: PollTarget> {
    shared: Arc<Shared<T>>,
    visibility: Option<JoinHandle<()>>,
}

impl<T: PollTarget> PollScheduler<T> {
    pub fn new(target: Arc<T>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                target,
                interval,
                timer: Mutex::new(None),
            }),
            visibility: None,
        }
    }

    pub fn start(&self) {
        self.shared.start();
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> PollState {
        self.shared.state()
    }

    /// Follow `visibility`: poll while visible, pause while hidden. Becoming
    /// visible again refreshes immediately. The current value applies at once.
    pub fn attach_visibility(&mut self, mut visibility: watch::Receiver<Visibility>) {
        self.detach_visibility();

        match *visibility.borrow_and_update() {
            Visibility::Visible => self.shared.resume(),
            Visibility::Hidden => self.shared.stop(),
        }

        let shared = self.shared.clone();
        self.visibility = Some(tokio::spawn(async move {
            while visibility.changed().await.is_ok() {
                let current = *visibility.borrow_and_update();
                debug!("Board is now {:?}", current);
                match current {
                    Visibility::Visible => shared.resume(),
                    Visibility::Hidden => shared.stop(),
                }
            }
        }));
    }

    fn detach_visibility(&mut self) {
        if let Some(listener) = self.visibility.take() {
            listener.abort();
        }
    }

    /// Cancel the timer and the visibility listener.
    pub fn shutdown(&mut self) {
        self.detach_visibility();
        self.shared.stop();
    }
}

impl<T: PollTarget> Drop for PollScheduler<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
