//! In-memory object store
//!
//! Holds a single object and applies merge patches to it the way an API
//! server would, including the removal of selected fields when they are
//! patched to an empty list or map.

use reconciler_core::{Body, Error, FieldPath, Patch, Result};
use reconciler_effects::Patcher;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

pub struct MemoryStore {
    object: RwLock<Option<Value>>,
    writes: RwLock<Vec<Patch>>,
    collapsing: Vec<FieldPath>,
    failing: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new(body: Body) -> Self {
        Self {
            object: RwLock::new(Some(body.into_value())),
            writes: RwLock::new(Vec::new()),
            collapsing: Vec::new(),
            failing: RwLock::new(None),
        }
    }

    /// Fields that vanish instead of holding an empty value.
    pub fn with_collapsing(mut self, fields: Vec<FieldPath>) -> Self {
        self.collapsing = fields;
        self
    }

    /// The current body, or `None` once deleted.
    pub async fn body(&self) -> Option<Body> {
        self.object.read().await.clone().map(Body::new)
    }

    pub async fn delete(&self) {
        *self.object.write().await = None;
    }

    /// Make every following write fail with this message, or succeed again with `None`.
    pub async fn set_failing(&self, message: Option<String>) {
        *self.failing.write().await = message;
    }

    pub async fn writes(&self) -> Vec<Patch> {
        self.writes.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Patcher for MemoryStore {
    async fn patch(&self, patch: &Patch, _body: &Body) -> Result<Option<Body>> {
        if let Some(message) = self.failing.read().await.as_ref() {
            return Err(Error::patch(message.clone()));
        }

        let mut object = self.object.write().await;
        let Some(value) = object.as_mut() else {
            return Ok(None);
        };
        merge_patch(value, &patch.to_value());
        for field in &self.collapsing {
            collapse_empty(value, field.keys());
        }
        self.writes.write().await.push(patch.clone());
        Ok(Some(Body::new(value.clone())))
    }
}

/// RFC 7386 merge: `null` removes, objects merge recursively, the rest replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(changes) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(fields) = target else {
        return;
    };
    for (key, change) in changes {
        if change.is_null() {
            fields.remove(key);
        } else {
            merge_patch(fields.entry(key.clone()).or_insert(Value::Null), change);
        }
    }
}

fn collapse_empty(value: &mut Value, keys: &[String]) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut node = value;
    for key in parents {
        match node.get_mut(key) {
            Some(child) => node = child,
            None => return,
        }
    }
    let Some(fields) = node.as_object_mut() else {
        return;
    };
    let empty = match fields.get(last) {
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    };
    if empty {
        fields.remove(last);
    }
}
