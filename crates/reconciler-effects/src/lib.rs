//! Reconciler Effects - Applying patches, sleeping, touching, and throttling
//!
//! Applying the effects is the last step of a reconciliation cycle. Upstream
//! code decides what has changed and what the handlers want; this crate turns
//! the accumulated patch and delays into writes and timed waits:
//!
//! * patching the object and verifying the patch took effect,
//! * sleeping for the nearest delay, or until new activity interrupts it,
//! * touching the object so the next cycle fires after a full sleep.
//!
//! Repeatedly failing cycles are wrapped in [`throttled`] so that errors turn
//! into backoff instead of a hot loop.

pub mod consistency;
pub mod effects;
pub mod progress;
pub mod sleeping;
pub mod throttling;
pub mod wakeup;

pub use consistency::{find_inconsistencies, ConsistencyChecker, Patcher};
pub use effects::EffectApplier;
pub use progress::{
    progress_storage_from, AnnotationsProgressStorage, ProgressStorage, SmartProgressStorage,
    StatusProgressStorage,
};
pub use sleeping::sleep_or_wait;
pub use throttling::{throttled, Escalate, ThrottleState};
pub use wakeup::{DaemonStopper, Flag, StopReason, Wakeup};
