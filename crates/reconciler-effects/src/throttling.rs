//! Error throttling for repeatedly failing operations
//!
//! A worker keeps one [`ThrottleState`] per object across cycles and passes it
//! into [`throttled`] on every cycle. A fresh failure starts a backoff window;
//! calls made inside the window are told not to run. Success releases the
//! backoff sequence so the next failure starts from its beginning again.

use crate::sleeping::sleep_or_wait;
use crate::wakeup::Wakeup;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// Errors that bypass throttling no matter what.
pub trait Escalate {
    fn is_fatal(&self) -> bool;
}

impl Escalate for reconciler_core::Error {
    fn is_fatal(&self) -> bool {
        reconciler_core::Error::is_fatal(self)
    }
}

type DelaySource = Box<dyn Iterator<Item = Duration> + Send>;

/// Stand-in deadline for delays that do not fit into an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or(now + FAR_FUTURE)
}

/// Backoff memory of one worker. Idle while `active_until` is `None`.
#[derive(Default)]
pub struct ThrottleState {
    active_until: Option<Instant>,
    source_of_delays: Option<DelaySource>,
    last_used_delay: Option<Duration>,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_until(&self) -> Option<Instant> {
        self.active_until
    }

    pub fn is_throttling(&self) -> bool {
        self.active_until.is_some()
    }

    pub fn last_used_delay(&self) -> Option<Duration> {
        self.last_used_delay
    }

    pub fn has_delay_source(&self) -> bool {
        self.source_of_delays.is_some()
    }

    /// Sleep out the current window. Goes idle only if not interrupted.
    async fn wait_out(&mut self, wakeup: Option<&dyn Wakeup>) {
        let Some(until) = self.active_until else {
            return;
        };
        let remaining = until.saturating_duration_since(Instant::now());
        if sleep_or_wait(remaining, wakeup).await.is_none() {
            info!("Throttling is over. Switching back to normal operations.");
            self.active_until = None;
        }
    }
}

impl std::fmt::Debug for ThrottleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleState")
            .field("active_until", &self.active_until)
            .field("source_of_delays", &self.source_of_delays.is_some())
            .field("last_used_delay", &self.last_used_delay)
            .finish()
    }
}

/// Run `op` under throttling.
///
/// `op` receives `should_run`: `false` means a backoff window is still active
/// and the caller should skip its real work this time. The outcome is:
///
/// * `Ok(Some(value))` when `op` succeeded,
/// * `Ok(None)` when `op` failed and the failure went into backoff,
/// * `Err(e)` when the failure is fatal, not of interest to `errors`, or
///   happened although `op` was told not to run.
///
/// `delays` is the backoff sequence. It is only consumed when a failure starts
/// or continues a backoff; once exhausted, the last delay repeats. A fresh
/// window is slept out before returning, so a failing worker pauses inline.
pub async fn throttled<T, E, D, P, F, Fut>(
    state: &mut ThrottleState,
    delays: D,
    wakeup: Option<&dyn Wakeup>,
    errors: P,
    op: F,
) -> Result<Option<T>, E>
where
    D: IntoIterator<Item = Duration>,
    D::IntoIter: Send + 'static,
    E: Escalate + Display,
    P: Fn(&E) -> bool,
    F: FnOnce(bool) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    // Throttling may still be active from an earlier cycle whose sleep was interrupted.
    state.wait_out(wakeup).await;

    let should_run = state.active_until.is_none();
    let outcome = match op(should_run).await {
        Ok(value) => {
            if should_run {
                state.source_of_delays = None;
                state.last_used_delay = None;
            }
            Some(value)
        }
        Err(e) => {
            if e.is_fatal() || !errors(&e) || !should_run {
                return Err(e);
            }

            let source = state
                .source_of_delays
                .get_or_insert_with(|| Box::new(delays.into_iter()));
            match source.next().or(state.last_used_delay) {
                Some(delay) => {
                    state.last_used_delay = Some(delay);
                    state.active_until = Some(deadline_after(delay));
                    error!(error = %e, "Throttling for {:?} due to an unexpected error", delay);
                }
                None => {
                    error!(error = %e, "Unexpected error with no backoff delays configured");
                }
            }
            None
        }
    };

    // A fresh failure: sleep it out here rather than leave it to the caller's loop.
    if should_run {
        state.wait_out(wakeup).await;
    }
    Ok(outcome)
}
