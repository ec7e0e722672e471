//! Reconciler - drives one object at a time toward its desired state
//!
//! The effect-application core lives in `reconciler-effects`; this crate adds
//! the per-object worker that wraps a handler in throttling, an in-memory store
//! for simulations and tests, and a scripted handler.

pub mod script;
pub mod store;
pub mod worker;

pub use script::{FailureKind, ScriptedCycle, ScriptedHandler};
pub use store::{merge_patch, MemoryStore};
pub use worker::{CycleOutcome, Handler, ObjectWorker, Outcome};
