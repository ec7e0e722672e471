//! Patching with post-write verification

use reconciler_core::{diff, is_empty_value, Body, Diff, DiffScope, FieldPath, Patch, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// The transport that writes patches to the store.
#[async_trait::async_trait]
pub trait Patcher: Send + Sync {
    /// Apply the patch and return the authoritative resulting body, or `None`
    /// if the object no longer exists.
    async fn patch(&self, patch: &Patch, body: &Body) -> Result<Option<Body>>;
}

/// Diff a patch against the body the store returned, keeping only real
/// divergences.
///
/// Only fields mentioned in the patch are inspected. Fields listed in `known`
/// are dropped when both sides are empty: the store removes them entirely
/// when they are patched to an empty list or map.
pub fn find_inconsistencies(patch: &Patch, resulting: &Body, known: &[FieldPath]) -> Diff {
    diff(&patch.to_value(), resulting.as_value(), DiffScope::Left)
        .into_iter()
        .filter(|item| {
            !is_empty_value(&item.old) || !is_empty_value(&item.new) || !known.contains(&item.field)
        })
        .collect()
}

/// Writes patches and warns when the stored state diverges from them.
#[derive(Clone)]
pub struct ConsistencyChecker {
    patcher: Arc<dyn Patcher>,
    known_inconsistencies: Vec<FieldPath>,
}

impl ConsistencyChecker {
    pub fn new(patcher: Arc<dyn Patcher>, known_inconsistencies: Vec<FieldPath>) -> Self {
        Self {
            patcher,
            known_inconsistencies,
        }
    }

    /// Apply a patch and verify that it was applied.
    ///
    /// An empty patch is not sent at all. Divergence is only logged; the only
    /// error returned is a failure of the transport itself.
    pub async fn patch_and_check(&self, patch: &Patch, body: &Body) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        debug!("Patching with: {}", patch);
        let Some(resulting) = self.patcher.patch(patch, body).await? else {
            debug!("Patching skipped: the object is gone");
            return Ok(());
        };

        let inconsistencies = find_inconsistencies(patch, &resulting, &self.known_inconsistencies);
        if !inconsistencies.is_empty() {
            warn!("Patching failed with inconsistencies: {}", inconsistencies);
        }
        Ok(())
    }
}
