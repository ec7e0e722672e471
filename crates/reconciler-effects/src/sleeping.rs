//! Interruptible sleeping

use crate::wakeup::Wakeup;
use reconciler_core::DelaySet;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Sleep for the smallest of the delays, or until the wakeup signal is set.
///
/// Returns the time left to sleep if interrupted, or `None` if the sleep ran
/// to its end (an equivalent of zero). The result can be zero if the signal
/// arrived at the very last moment. A zero delay, or no delays at all, returns
/// `None` at once without touching the timer.
///
/// The signal is only observed, never set or cleared.
pub async fn sleep_or_wait(
    delays: impl Into<DelaySet>,
    wakeup: Option<&dyn Wakeup>,
) -> Option<Duration> {
    let minimal_delay = delays.into().minimum().unwrap_or(Duration::ZERO);
    if minimal_delay.is_zero() {
        return None;
    }

    let Some(wakeup) = wakeup else {
        time::sleep(minimal_delay).await;
        return None;
    };

    let start = Instant::now();
    match time::timeout(minimal_delay, wakeup.wait()).await {
        Err(_) => None,
        Ok(()) => Some(minimal_delay.saturating_sub(start.elapsed())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wakeup::{DaemonStopper, Flag, StopReason};

    #[tokio::test(start_paused = true)]
    async fn zero_delay_returns_immediately() {
        let start = Instant::now();
        assert_eq!(sleep_or_wait(Duration::ZERO, None).await, None);
        assert_eq!(sleep_or_wait(DelaySet::new(), None).await, None);
        assert_eq!(sleep_or_wait(vec![None::<Duration>, None], None).await, None);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_ignores_a_set_flag() {
        let flag = Flag::new();
        flag.set();
        assert_eq!(sleep_or_wait(Duration::ZERO, Some(&flag)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_for_the_minimal_delay() {
        let start = Instant::now();
        let delays = vec![Some(Duration::from_secs(10)), None, Some(Duration::from_secs(3))];
        assert_eq!(sleep_or_wait(delays, Some(&Flag::new())).await, None);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn already_set_flag_returns_full_remainder() {
        let flag = Flag::new();
        flag.set();
        let unslept = sleep_or_wait(Duration::from_secs(5), Some(&flag)).await;
        assert_eq!(unslept, Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn interruption_returns_remaining_time() {
        let flag = Flag::new();
        let setter = flag.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(2)).await;
            setter.set();
        });
        let unslept = sleep_or_wait(Duration::from_secs(5), Some(&flag)).await;
        assert_eq!(unslept, Some(Duration::from_secs(3)));
        assert!(flag.is_set(), "the sleeper must not clear the flag");
    }

    #[tokio::test(start_paused = true)]
    async fn stopper_interrupts_via_its_token() {
        let stopper = DaemonStopper::new();
        let remote = stopper.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            remote.stop(StopReason::OperatorExiting);
        });
        let unslept = sleep_or_wait(Duration::from_secs(4), Some(&stopper)).await;
        assert_eq!(unslept, Some(Duration::from_secs(3)));
    }
}
