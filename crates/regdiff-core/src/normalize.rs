//! Payload normalization
//!
//! Turns an arbitrary JSON-like payload into a [`NormalizedValue`]: a tagged
//! tree of scalars, ordered sequences and key-sorted mappings. Two payloads
//! that differ only in mapping insertion order normalize to equal values, so
//! the differ never reports spurious reordering.
//!
//! With `hide_empty`, empty leaves (null, empty string) and containers whose
//! members are all empty are pruned bottom-up.

use crate::errors::{RegDiffError, Result};
use crate::path::{PathSegment, ValuePath};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Options for [`normalize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub hide_empty: bool,
    /// Deepest nesting accepted; deeper input is treated as unrepresentable
    pub max_depth: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            hide_empty: false,
            max_depth: crate::config::DEFAULT_MAX_DEPTH,
        }
    }
}

impl NormalizeOptions {
    pub fn hiding_empty() -> Self {
        Self {
            hide_empty: true,
            ..Self::default()
        }
    }
}

/// Leaf value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Null and the empty string count as empty
    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::String(s) => s.is_empty(),
            Scalar::Bool(_) | Scalar::Number(_) => false,
        }
    }
}

/// Which of the three variants a value is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Sequence,
    Mapping,
}

/// Canonical payload tree used as diff input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Scalar(Scalar),
    Sequence(Vec<NormalizedValue>),
    /// Keys iterate in ascending lexicographic order
    Mapping(BTreeMap<String, NormalizedValue>),
}

impl NormalizedValue {
    pub fn null() -> Self {
        NormalizedValue::Scalar(Scalar::Null)
    }

    pub fn empty_mapping() -> Self {
        NormalizedValue::Mapping(BTreeMap::new())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            NormalizedValue::Scalar(_) => ValueKind::Scalar,
            NormalizedValue::Sequence(_) => ValueKind::Sequence,
            NormalizedValue::Mapping(_) => ValueKind::Mapping,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, NormalizedValue::Scalar(_))
    }

    /// Empty scalar, or a container whose every member is empty
    pub fn is_empty(&self) -> bool {
        match self {
            NormalizedValue::Scalar(s) => s.is_empty(),
            NormalizedValue::Sequence(items) => items.iter().all(NormalizedValue::is_empty),
            NormalizedValue::Mapping(entries) => entries.values().all(NormalizedValue::is_empty),
        }
    }

    /// Same kind, with no members (a scalar becomes null)
    pub fn emptied(&self) -> Self {
        match self {
            NormalizedValue::Scalar(_) => NormalizedValue::null(),
            NormalizedValue::Sequence(_) => NormalizedValue::Sequence(Vec::new()),
            NormalizedValue::Mapping(_) => NormalizedValue::empty_mapping(),
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, NormalizedValue>> {
        match self {
            NormalizedValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[NormalizedValue]> {
        match self {
            NormalizedValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Member at `key` of a mapping
    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Convert back into a plain JSON value
    pub fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl From<&NormalizedValue> for Value {
    fn from(value: &NormalizedValue) -> Self {
        match value {
            NormalizedValue::Scalar(Scalar::Null) => Value::Null,
            NormalizedValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            NormalizedValue::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            NormalizedValue::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            NormalizedValue::Sequence(items) => Value::Array(items.iter().map(Value::from).collect()),
            NormalizedValue::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl std::fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Normalize a payload
///
/// # Errors
///
/// `DepthExceeded` when nesting goes past `options.max_depth`. JSON values
/// cannot be cyclic, so excessive depth is the only unrepresentable input;
/// it is fatal and never partially recovered.
pub fn normalize(value: &Value, options: &NormalizeOptions) -> Result<NormalizedValue> {
    let mut path = ValuePath::root();
    let normalized = normalize_at(value, options, 0, &mut path)?;
    if options.hide_empty && normalized.is_empty() {
        return Ok(normalized.emptied());
    }
    Ok(normalized)
}

/// Normalize an optional payload; absent stays absent
///
/// # Errors
///
/// As [`normalize`].
pub fn normalize_optional(
    value: Option<&Value>,
    options: &NormalizeOptions,
) -> Result<Option<NormalizedValue>> {
    value.map(|v| normalize(v, options)).transpose()
}

fn normalize_at(
    value: &Value,
    options: &NormalizeOptions,
    depth: usize,
    path: &mut ValuePath,
) -> Result<NormalizedValue> {
    if depth > options.max_depth {
        return Err(RegDiffError::DepthExceeded {
            max_depth: options.max_depth,
            path: path.to_string(),
        });
    }

    let normalized = match value {
        Value::Null => NormalizedValue::Scalar(Scalar::Null),
        Value::Bool(b) => NormalizedValue::Scalar(Scalar::Bool(*b)),
        Value::Number(n) => NormalizedValue::Scalar(Scalar::Number(n.clone())),
        Value::String(s) => NormalizedValue::Scalar(Scalar::String(s.clone())),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                let child = normalize_at(item, options, depth + 1, path)?;
                path.pop();
                if options.hide_empty && child.is_empty() {
                    continue;
                }
                out.push(child);
            }
            NormalizedValue::Sequence(out)
        }
        Value::Object(entries) => {
            let mut out = BTreeMap::new();
            for (key, item) in entries {
                path.push(PathSegment::Key(key.clone()));
                let child = normalize_at(item, options, depth + 1, path)?;
                path.pop();
                if options.hide_empty && child.is_empty() {
                    continue;
                }
                out.insert(key.clone(), child);
            }
            NormalizedValue::Mapping(out)
        }
    };

    Ok(normalized)
}
