//! Core types for the reconciler

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// A path to a field inside an object body, e.g. `metadata.labels`.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted path. Empty segments are dropped.
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

fn lookup<'a>(mut value: &'a Value, keys: &[String]) -> Option<&'a Value> {
    for key in keys {
        value = value.as_object()?.get(key)?;
    }
    Some(value)
}

/// Read-only snapshot of an object's persisted state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Body(Value);

impl Body {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        lookup(&self.0, path.keys())
    }

    /// True if the field exists, even when it holds `null`.
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata")?.as_object()
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata()?.get("name")?.as_str()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata()?.get("namespace")?.as_str()
    }
}

impl Default for Body {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// An intended mutation of an object, in JSON merge-patch form.
///
/// A `null` leaf removes the field. An empty patch means no write is needed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Set a field, creating intermediate objects as needed.
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        let Some((last, parents)) = path.keys().split_last() else {
            return;
        };
        let mut node = &mut self.0;
        for key in parents {
            let entry = node
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            node = map;
        }
        node.insert(last.clone(), value);
    }

    /// Mark a field for removal.
    pub fn remove(&mut self, path: &FieldPath) {
        self.set(path, Value::Null);
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let (first, rest) = path.keys().split_first()?;
        let value = self.0.get(first)?;
        lookup(value, rest)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl std::fmt::Display for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Patch {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(crate::Error::patch(format!(
                "patch must be an object, got {other}"
            ))),
        }
    }
}

/// Candidate delays until the next reconciliation, one per opinion.
///
/// `None` entries mean "no opinion" and never bind the deadline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DelaySet(Vec<Option<Duration>>);

impl DelaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from seconds; negative values saturate to zero, infinite ones
    /// carry no opinion.
    pub fn from_secs_f64<I>(secs: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        secs.into_iter()
            .map(|s| s.and_then(|s| Duration::try_from_secs_f64(s.max(0.0)).ok()))
            .collect()
    }

    /// The binding deadline: the smallest non-`None` entry.
    pub fn minimum(&self) -> Option<Duration> {
        self.0.iter().flatten().min().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Option<Duration>> for DelaySet {
    fn from_iter<I: IntoIterator<Item = Option<Duration>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromIterator<Duration> for DelaySet {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        Self(iter.into_iter().map(Some).collect())
    }
}

impl From<Duration> for DelaySet {
    fn from(delay: Duration) -> Self {
        Self(vec![Some(delay)])
    }
}

impl From<Option<Duration>> for DelaySet {
    fn from(delay: Option<Duration>) -> Self {
        Self(vec![delay])
    }
}

impl From<Vec<Duration>> for DelaySet {
    fn from(delays: Vec<Duration>) -> Self {
        delays.into_iter().collect()
    }
}

impl From<Vec<Option<Duration>>> for DelaySet {
    fn from(delays: Vec<Option<Duration>>) -> Self {
        Self(delays)
    }
}

impl From<&[Duration]> for DelaySet {
    fn from(delays: &[Duration]) -> Self {
        delays.iter().copied().collect()
    }
}

impl From<&[Option<Duration>]> for DelaySet {
    fn from(delays: &[Option<Duration>]) -> Self {
        Self(delays.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_set_creates_intermediate_objects() {
        let mut patch = Patch::new();
        patch.set(&"status.reconciler.dummy".into(), json!("x"));
        assert_eq!(patch.to_value(), json!({"status": {"reconciler": {"dummy": "x"}}}));
    }

    #[test]
    fn patch_set_overwrites_scalar_parent() {
        let mut patch = Patch::new();
        patch.set(&"spec".into(), json!(1));
        patch.set(&"spec.replicas".into(), json!(3));
        assert_eq!(patch.to_value(), json!({"spec": {"replicas": 3}}));
    }

    #[test]
    fn patch_set_root_is_noop() {
        let mut patch = Patch::new();
        patch.set(&FieldPath::root(), json!(1));
        assert!(patch.is_empty());
    }

    #[test]
    fn body_lookup() {
        let body = Body::new(json!({"metadata": {"name": "obj", "namespace": "ns"}}));
        assert_eq!(body.name(), Some("obj"));
        assert_eq!(body.namespace(), Some("ns"));
        assert!(body.contains(&"metadata.name".into()));
        assert!(!body.contains(&"metadata.labels".into()));
    }

    #[test]
    fn delay_set_minimum_ignores_none() {
        let delays = DelaySet::from(vec![
            Some(Duration::from_secs(5)),
            None,
            Some(Duration::from_secs(3)),
        ]);
        assert_eq!(delays.minimum(), Some(Duration::from_secs(3)));
        assert_eq!(DelaySet::from(vec![None, None]).minimum(), None);
        assert_eq!(DelaySet::new().minimum(), None);
    }

    #[test]
    fn delay_set_from_negative_seconds_saturates() {
        let delays = DelaySet::from_secs_f64([Some(-1.0)]);
        assert_eq!(delays.minimum(), Some(Duration::ZERO));
    }
}
