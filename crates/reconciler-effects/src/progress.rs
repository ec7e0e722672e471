//! Bookkeeping marker storage
//!
//! The marker is a field that carries no meaning for the resource itself.
//! Writing a fresh value to it is a "touch": a harmless change that makes the
//! store emit a new event, so the next cycle runs.

use reconciler_core::{Body, FieldPath, Patch, PersistenceSettings, ProgressStorageKind};
use serde_json::Value;
use std::sync::Arc;

pub trait ProgressStorage: Send + Sync {
    /// Put `value` into the patch, or remove the marker with `None`.
    ///
    /// Nothing is added when the body already holds the same value, so
    /// clearing an absent marker leaves an empty patch empty.
    fn touch(&self, body: &Body, patch: &mut Patch, value: Option<&str>);
}

fn touch_field(field: &FieldPath, body: &Body, patch: &mut Patch, value: Option<&str>) {
    let wanted = value.map(|v| Value::String(v.to_string()));
    let current = body.get(field).filter(|v| !v.is_null());
    if current != wanted.as_ref() {
        patch.set(field, wanted.unwrap_or(Value::Null));
    }
}

/// Keeps the marker at `status.<name>.dummy`.
#[derive(Clone, Debug)]
pub struct StatusProgressStorage {
    field: FieldPath,
}

impl StatusProgressStorage {
    pub fn new(name: &str) -> Self {
        Self {
            field: ["status", name, "dummy"].into_iter().collect(),
        }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }
}

impl Default for StatusProgressStorage {
    fn default() -> Self {
        Self::new("reconciler")
    }
}

impl ProgressStorage for StatusProgressStorage {
    fn touch(&self, body: &Body, patch: &mut Patch, value: Option<&str>) {
        touch_field(&self.field, body, patch, value);
    }
}

/// Keeps the marker in the `<prefix>/touch-dummy` annotation.
#[derive(Clone, Debug)]
pub struct AnnotationsProgressStorage {
    field: FieldPath,
}

impl AnnotationsProgressStorage {
    pub fn new(prefix: &str) -> Self {
        let key = format!("{prefix}/touch-dummy");
        Self {
            field: ["metadata", "annotations", key.as_str()].into_iter().collect(),
        }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }
}

impl Default for AnnotationsProgressStorage {
    fn default() -> Self {
        Self::new("reconciler.dev")
    }
}

impl ProgressStorage for AnnotationsProgressStorage {
    fn touch(&self, body: &Body, patch: &mut Patch, value: Option<&str>) {
        touch_field(&self.field, body, patch, value);
    }
}

/// Writes the marker to both the status and the annotations.
#[derive(Clone, Debug, Default)]
pub struct SmartProgressStorage {
    status: StatusProgressStorage,
    annotations: AnnotationsProgressStorage,
}

impl SmartProgressStorage {
    pub fn new(status: StatusProgressStorage, annotations: AnnotationsProgressStorage) -> Self {
        Self {
            status,
            annotations,
        }
    }
}

impl ProgressStorage for SmartProgressStorage {
    fn touch(&self, body: &Body, patch: &mut Patch, value: Option<&str>) {
        self.status.touch(body, patch, value);
        self.annotations.touch(body, patch, value);
    }
}

pub fn progress_storage_from(settings: &PersistenceSettings) -> Arc<dyn ProgressStorage> {
    let status = || StatusProgressStorage::new(&settings.status_name);
    let annotations = || AnnotationsProgressStorage::new(&settings.annotations_prefix);
    match settings.progress_storage {
        ProgressStorageKind::Status => Arc::new(status()),
        ProgressStorageKind::Annotations => Arc::new(annotations()),
        ProgressStorageKind::Smart => Arc::new(SmartProgressStorage::new(status(), annotations())),
    }
}
