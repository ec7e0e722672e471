//! Per-object worker: one handler invocation and its effects per cycle

use reconciler_core::{Body, DelaySet, Error, Patch, Result, Settings};
use reconciler_effects::{throttled, EffectApplier, Flag, Patcher, ThrottleState};
use std::sync::Arc;
use std::time::Duration;

/// What a handler wants done with the object after one invocation.
#[derive(Clone, Debug, Default)]
pub struct Outcome {
    pub patch: Patch,
    pub delays: DelaySet,
}

impl Outcome {
    pub fn new(patch: Patch, delays: impl Into<DelaySet>) -> Self {
        Self {
            patch,
            delays: delays.into(),
        }
    }
}

/// Decides the patch and delays for an object.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, body: &Body) -> Result<Outcome>;
}

/// How a single cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing written, nothing scheduled: the object is settled.
    Applied,
    /// A write, a sleep, or a touch happened; another cycle will follow.
    Pending,
    /// A backoff window was still active; the handler was not invoked.
    Skipped,
    /// The cycle failed and went into backoff.
    Throttled,
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Pending => write!(f, "pending"),
            Self::Skipped => write!(f, "skipped"),
            Self::Throttled => write!(f, "throttled"),
        }
    }
}

/// Drives the reconciliation cycles of one object.
///
/// Owns the object's throttle state, so a worker must never run two cycles
/// concurrently. Other objects get their own workers.
pub struct ObjectWorker {
    handler: Arc<dyn Handler>,
    effects: EffectApplier,
    error_delays: Vec<Duration>,
    throttle: ThrottleState,
    wakeup: Flag,
}

impl ObjectWorker {
    pub fn new(handler: Arc<dyn Handler>, patcher: Arc<dyn Patcher>, settings: &Settings) -> Self {
        Self {
            handler,
            effects: EffectApplier::new(patcher, settings),
            error_delays: settings.batching.error_delays(),
            throttle: ThrottleState::new(),
            wakeup: Flag::new(),
        }
    }

    /// The signal to set when new information arrives for this object.
    ///
    /// Each cycle clears it on entry: the body it is given already carries
    /// whatever the signal announced.
    pub fn wakeup(&self) -> Flag {
        self.wakeup.clone()
    }

    pub fn throttle(&self) -> &ThrottleState {
        &self.throttle
    }

    /// Run one cycle: invoke the handler, then apply its patch and delays.
    ///
    /// Throttle-eligible failures of the handler or of the write go into
    /// backoff; fatal ones are returned.
    #[tracing::instrument(
        skip_all,
        fields(namespace = body.namespace().unwrap_or(""), name = body.name().unwrap_or(""))
    )]
    pub async fn run_cycle(&mut self, body: &Body) -> Result<CycleOutcome> {
        self.wakeup.clear();

        let handler = &self.handler;
        let effects = &self.effects;
        let wakeup = &self.wakeup;

        let outcome = throttled(
            &mut self.throttle,
            self.error_delays.clone(),
            Some(wakeup),
            Error::is_throttleable,
            |should_run| async move {
                if !should_run {
                    return Ok::<_, Error>(CycleOutcome::Skipped);
                }
                let Outcome { patch, delays } = handler.handle(body).await?;
                let applied = effects.apply(body, patch, delays, Some(wakeup)).await?;
                Ok(if applied {
                    CycleOutcome::Applied
                } else {
                    CycleOutcome::Pending
                })
            },
        )
        .await?;

        Ok(outcome.unwrap_or(CycleOutcome::Throttled))
    }
}
