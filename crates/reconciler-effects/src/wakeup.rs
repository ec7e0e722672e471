//! Signals that interrupt a pending sleep
//!
//! The sleeper only ever waits on these. The event ingestion layer sets them;
//! the worker consuming the new information clears them.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Anything a sleep can be interrupted by.
#[async_trait::async_trait]
pub trait Wakeup: Send + Sync {
    fn is_set(&self) -> bool;

    /// Resolve once the signal is set. Returns immediately if already set.
    async fn wait(&self);
}

/// A resettable event: new information has arrived for the object.
#[derive(Clone, Debug)]
pub struct Flag {
    tx: Arc<watch::Sender<bool>>,
}

impl Flag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn clear(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Wakeup for Flag {
    fn is_set(&self) -> bool {
        Flag::is_set(self)
    }

    async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|set| *set).await;
    }
}

/// Why a daemon was asked to stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Done,
    FiltersMismatch,
    ResourceDeleted,
    OperatorExiting,
    DaemonSignalled,
    DaemonCancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::FiltersMismatch => write!(f, "filters-mismatch"),
            Self::ResourceDeleted => write!(f, "resource-deleted"),
            Self::OperatorExiting => write!(f, "operator-exiting"),
            Self::DaemonSignalled => write!(f, "daemon-signalled"),
            Self::DaemonCancelled => write!(f, "daemon-cancelled"),
        }
    }
}

/// A stop handle for long-running per-object daemons.
///
/// Stopping is one-way. The first reason given is kept.
#[derive(Clone, Debug, Default)]
pub struct DaemonStopper {
    token: CancellationToken,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl DaemonStopper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self, reason: StopReason) {
        if let Ok(mut current) = self.reason.lock() {
            current.get_or_insert(reason);
        }
        self.token.cancel();
    }

    pub fn reason(&self) -> Option<StopReason> {
        self.reason.lock().ok().and_then(|r| *r)
    }

    /// The token that sleeps on this stopper wait on.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[async_trait::async_trait]
impl Wakeup for DaemonStopper {
    fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    async fn wait(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_set_and_clear() {
        let flag = Flag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        let clone = flag.clone();
        clone.clear();
        assert!(!flag.is_set());
    }

    #[tokio::test]
    async fn flag_wait_returns_when_already_set() {
        let flag = Flag::new();
        flag.set();
        flag.wait().await;
    }

    #[tokio::test]
    async fn flag_wait_wakes_on_set() {
        let flag = Flag::new();
        let setter = flag.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            setter.set();
        });
        flag.wait().await;
        assert!(flag.is_set());
    }

    #[test]
    fn stopper_keeps_first_reason() {
        let stopper = DaemonStopper::new();
        assert!(!stopper.is_set());
        assert_eq!(stopper.reason(), None);
        stopper.stop(StopReason::ResourceDeleted);
        stopper.stop(StopReason::OperatorExiting);
        assert!(stopper.is_set());
        assert!(stopper.token().is_cancelled());
        assert_eq!(stopper.reason(), Some(StopReason::ResourceDeleted));
    }
}
