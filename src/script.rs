//! Scripted handler: replays a fixed list of cycle outcomes
//!
//! Used by the simulation binary to exercise patching, sleeping, touching and
//! throttling against the in-memory store without a real handler.

use crate::worker::{Handler, Outcome};
use reconciler_core::{Body, DelaySet, Error, Patch, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Temporary,
    Permanent,
    Fatal,
}

/// One scripted handler invocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptedCycle {
    pub patch: Value,
    /// Seconds; `null` entries carry no opinion.
    pub delays: Vec<Option<f64>>,
    pub fail: Option<FailureKind>,
}

pub struct ScriptedHandler {
    cycles: Mutex<VecDeque<ScriptedCycle>>,
}

impl ScriptedHandler {
    pub fn new(cycles: Vec<ScriptedCycle>) -> Self {
        Self {
            cycles: Mutex::new(cycles.into()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let cycles: Vec<ScriptedCycle> = serde_json::from_str(text)?;
        Ok(Self::new(cycles))
    }

    pub async fn remaining(&self) -> usize {
        self.cycles.lock().await.len()
    }
}

#[async_trait::async_trait]
impl Handler for ScriptedHandler {
    /// Once the script runs out, the handler has nothing more to say.
    async fn handle(&self, _body: &Body) -> Result<Outcome> {
        let Some(cycle) = self.cycles.lock().await.pop_front() else {
            return Ok(Outcome::default());
        };
        match cycle.fail {
            Some(FailureKind::Temporary) => Err(Error::temporary("scripted failure")),
            Some(FailureKind::Permanent) => Err(Error::permanent("scripted failure")),
            Some(FailureKind::Fatal) => Err(Error::fatal("scripted failure")),
            None => Ok(Outcome {
                patch: Patch::try_from(cycle.patch)?,
                delays: DelaySet::from_secs_f64(cycle.delays),
            }),
        }
    }
}
