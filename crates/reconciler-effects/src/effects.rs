//! Per-cycle effect application: patch, then sleep or touch

use crate::consistency::{ConsistencyChecker, Patcher};
use crate::progress::{progress_storage_from, ProgressStorage};
use crate::sleeping::sleep_or_wait;
use crate::wakeup::Wakeup;
use chrono::{SecondsFormat, Utc};
use reconciler_core::{Body, DelaySet, Patch, Result, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Applies the patch and delays accumulated during one reconciliation cycle.
///
/// Writes always happen before any sleep: a write makes the store emit a new
/// event, which restarts the cycle anyway. A full sleep without a write ends
/// with a touch so that the next cycle is guaranteed to fire.
pub struct EffectApplier {
    checker: ConsistencyChecker,
    progress: Arc<dyn ProgressStorage>,
    keepalive: Duration,
}

impl EffectApplier {
    pub fn new(patcher: Arc<dyn Patcher>, settings: &Settings) -> Self {
        Self {
            checker: ConsistencyChecker::new(
                patcher,
                settings.effects.known_inconsistencies.clone(),
            ),
            progress: progress_storage_from(&settings.persistence),
            keepalive: settings.effects.keepalive(),
        }
    }

    /// Apply one cycle's effects.
    ///
    /// Returns `true` when there was nothing to write and nothing scheduled,
    /// i.e. the object has reached its steady state. Transport errors are
    /// returned as is; nothing is retried here.
    pub async fn apply(
        &self,
        body: &Body,
        mut patch: Patch,
        delays: impl Into<DelaySet>,
        wakeup: Option<&dyn Wakeup>,
    ) -> Result<bool> {
        let delay = delays.into().minimum();

        // Drop a stale marker along with a real write, but never write just for that.
        if !patch.is_empty() {
            self.progress.touch(body, &mut patch, None);
        }
        let patched = !patch.is_empty();
        self.checker.patch_and_check(&patch, body).await?;

        let Some(delay) = delay else {
            return Ok(!patched);
        };

        // The write above restarts the cycle; a zero delay with a patch is no exception.
        if patched {
            debug!("Sleeping was skipped because of the patch, {:?} left.", delay);
            return Ok(false);
        }

        let unslept = if delay > self.keepalive {
            debug!(
                "Sleeping for {:?} (capped {:?}) for the delayed handlers.",
                delay, self.keepalive
            );
            sleep_or_wait(self.keepalive, wakeup).await
        } else if !delay.is_zero() {
            debug!("Sleeping for {:?} for the delayed handlers.", delay);
            sleep_or_wait(delay, wakeup).await
        } else {
            None
        };

        match unslept {
            Some(left) => {
                debug!("Sleeping was interrupted by new changes, {:?} left.", left);
            }
            None => {
                // Any unique, always-changing value will do.
                let value = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
                let mut touch = Patch::new();
                self.progress.touch(body, &mut touch, Some(&value));
                self.checker.patch_and_check(&touch, body).await?;
            }
        }
        Ok(false)
    }
}
