//! Structural diffs of JSON object bodies
//!
//! Absent keys and `null` values are treated alike: both mean "no value".
//! The scope decides which side's exclusive keys are inspected at all, so a
//! left-scoped diff of a patch against a resulting body never reports fields
//! the patch did not mention.

use crate::types::FieldPath;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOperation {
    Add,
    Change,
    Remove,
}

impl std::fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Change => write!(f, "change"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Which side's exclusive keys take part in a diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffScope {
    Full,
    Left,
    Right,
}

impl DiffScope {
    fn includes_left(self) -> bool {
        matches!(self, Self::Full | Self::Left)
    }

    fn includes_right(self) -> bool {
        matches!(self, Self::Full | Self::Right)
    }
}

/// One differing field. Absent values are `Value::Null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiffItem {
    pub operation: DiffOperation,
    pub field: FieldPath,
    pub old: Value,
    pub new: Value,
}

impl std::fmt::Display for DiffItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.operation, self.field, self.old, self.new
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diff(Vec<DiffItem>);

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffItem> {
        self.0.iter()
    }
}

impl std::fmt::Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", items.join(", "))
    }
}

impl FromIterator<DiffItem> for Diff {
    fn from_iter<I: IntoIterator<Item = DiffItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diff {
    type Item = DiffItem;
    type IntoIter = std::vec::IntoIter<DiffItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a DiffItem;
    type IntoIter = std::slice::Iter<'a, DiffItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compare two values field by field.
pub fn diff(a: &Value, b: &Value, scope: DiffScope) -> Diff {
    let mut items = Vec::new();
    diff_into(&mut items, a, b, FieldPath::root(), scope);
    Diff(items)
}

fn diff_into(items: &mut Vec<DiffItem>, a: &Value, b: &Value, path: FieldPath, scope: DiffScope) {
    if a == b {
        return;
    }
    let item = |operation| DiffItem {
        operation,
        field: path.clone(),
        old: a.clone(),
        new: b.clone(),
    };
    match (a, b) {
        (Value::Null, _) => items.push(item(DiffOperation::Add)),
        (_, Value::Null) => items.push(item(DiffOperation::Remove)),
        (Value::Object(left), Value::Object(right)) => {
            if scope.includes_right() {
                for (key, value) in right.iter().filter(|(k, _)| !left.contains_key(*k)) {
                    diff_into(items, &Value::Null, value, path.child(key), scope);
                }
            }
            if scope.includes_left() {
                for (key, value) in left.iter().filter(|(k, _)| !right.contains_key(*k)) {
                    diff_into(items, value, &Value::Null, path.child(key), scope);
                }
            }
            for (key, value) in left {
                if let Some(other) = right.get(key) {
                    diff_into(items, value, other, path.child(key), scope);
                }
            }
        }
        _ => items.push(item(DiffOperation::Change)),
    }
}

/// JSON falsiness: null, `false`, zero, and empty strings, arrays, objects.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
