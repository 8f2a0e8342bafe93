//! Shape-equality memoization for repeated diffing.
//!
//! A render loop asks for the same comparison over and over. [`should_recompute`]
//! decides whether a new input pair warrants a fresh diff, and [`DiffMemo`]
//! keeps the last result around.
//!
//! The check is two-tier: shape first (mapping keys and sequence lengths at
//! every level, ignoring scalar values), then full value equality. A shape
//! mismatch always means recompute. A shape match never suppresses a
//! recompute on its own; only equal values do. The memo is advisory: diff
//! results never depend on it.

use crate::diff::engine::compute_diff;
use crate::diff::model::DiffTree;
use crate::errors::Result;
use crate::normalize::NormalizeOptions;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Whether two values have the same structural skeleton
///
/// Scalars of any kind or value match each other. Containers match only a
/// container of the same kind with the same keys (mappings) or length
/// (sequences), recursively.
pub fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, xv)| y.get(k).is_some_and(|yv| same_shape(xv, yv)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(xv, yv)| same_shape(xv, yv))
        }
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        _ => true,
    }
}

/// Decide whether the pair `(next_a, next_b)` needs a fresh diff, given that
/// `(prev_a, prev_b)` was diffed last
///
/// Returns `false` only if both sides are deeply equal to their previous
/// counterpart, whether or not they are the same allocation.
pub fn should_recompute(
    prev_a: Option<&Value>,
    prev_b: Option<&Value>,
    next_a: Option<&Value>,
    next_b: Option<&Value>,
) -> bool {
    side_differs(prev_a, next_a) || side_differs(prev_b, next_b)
}

fn side_differs(prev: Option<&Value>, next: Option<&Value>) -> bool {
    match (prev, next) {
        (None, None) => false,
        (Some(p), Some(n)) => {
            if std::ptr::eq(p, n) {
                return false;
            }
            if !same_shape(p, n) {
                return true;
            }
            p != n
        }
        _ => true,
    }
}

/// SHA-256 digest of a value's structural skeleton
///
/// Equal fingerprints mean [`same_shape`] holds (barring collisions); scalar
/// values do not contribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeFingerprint(String);

impl ShapeFingerprint {
    pub fn of(value: &Value) -> Self {
        let mut hasher = Sha256::new();
        feed_skeleton(&mut hasher, value);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn feed_skeleton(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Object(entries) => {
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort();
            hasher.update(b"{");
            hasher.update((keys.len() as u64).to_be_bytes());
            for key in keys {
                // length prefix keeps "ab"+"c" distinct from "a"+"bc"
                hasher.update((key.len() as u64).to_be_bytes());
                hasher.update(key.as_bytes());
                if let Some(child) = entries.get(key) {
                    feed_skeleton(hasher, child);
                }
            }
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                feed_skeleton(hasher, item);
            }
            hasher.update(b"]");
        }
        _ => hasher.update(b"s"),
    }
}

struct MemoEntry {
    a: Option<Value>,
    b: Option<Value>,
    shapes: (Option<ShapeFingerprint>, Option<ShapeFingerprint>),
    tree: Arc<DiffTree>,
}

/// Single-slot memoizing differ
///
/// Holds the last input pair and its tree. Changing the normalization
/// options clears the slot.
pub struct DiffMemo {
    options: NormalizeOptions,
    last: Option<MemoEntry>,
    hits: u64,
    misses: u64,
}

impl DiffMemo {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            last: None,
            hits: 0,
            misses: 0,
        }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: NormalizeOptions) {
        if options != self.options {
            self.options = options;
            self.last = None;
        }
    }

    /// Diff `a` against `b`, reusing the previous tree when inputs are equal
    ///
    /// A hit costs one [`should_recompute`] pass against the cached inputs.
    /// Fingerprints are only taken on a miss.
    ///
    /// # Errors
    ///
    /// As [`compute_diff`]; a failed diff leaves the cached entry untouched.
    pub fn diff(&mut self, a: Option<&Value>, b: Option<&Value>) -> Result<Arc<DiffTree>> {
        if let Some(last) = &self.last {
            if !should_recompute(last.a.as_ref(), last.b.as_ref(), a, b) {
                self.hits += 1;
                tracing::debug!(op = "memo_diff", hits = self.hits, "reusing cached diff");
                return Ok(Arc::clone(&last.tree));
            }
        }

        self.misses += 1;
        let tree = Arc::new(compute_diff(a, b, &self.options)?);
        let shapes = (a.map(ShapeFingerprint::of), b.map(ShapeFingerprint::of));
        tracing::debug!(
            op = "memo_diff",
            misses = self.misses,
            a_shape = shapes.0.as_ref().map(ShapeFingerprint::as_str),
            b_shape = shapes.1.as_ref().map(ShapeFingerprint::as_str),
            "computed fresh diff"
        );
        self.last = Some(MemoEntry {
            a: a.cloned(),
            b: b.cloned(),
            shapes,
            tree: Arc::clone(&tree),
        });
        Ok(tree)
    }

    /// Skeleton fingerprints of the cached pair, if any
    pub fn cached_shapes(&self) -> Option<(Option<&ShapeFingerprint>, Option<&ShapeFingerprint>)> {
        self.last
            .as_ref()
            .map(|last| (last.shapes.0.as_ref(), last.shapes.1.as_ref()))
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

impl Default for DiffMemo {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_shape_ignores_scalar_values() {
        assert!(same_shape(&json!({"a": 1, "b": [1, 2]}), &json!({"b": ["x", null], "a": true})));
        assert!(!same_shape(&json!({"a": 1}), &json!({"b": 1})));
        assert!(!same_shape(&json!([1, 2]), &json!([1])));
        assert!(!same_shape(&json!({"a": {}}), &json!({"a": []})));
        assert!(!same_shape(&json!({"a": 1}), &json!({"a": {"x": 1}})));
    }

    #[test]
    fn test_equal_but_distinct_values_skip() {
        let a1 = json!({"x": [1, 2, {"y": "z"}]});
        let a2 = a1.clone();
        let b1 = json!({"x": []});
        let b2 = b1.clone();
        assert!(!should_recompute(Some(&a1), Some(&b1), Some(&a2), Some(&b2)));
    }

    #[test]
    fn test_same_allocation_skips() {
        let a = json!({"x": 1});
        assert!(!should_recompute(Some(&a), None, Some(&a), None));
    }

    #[test]
    fn test_same_shape_different_leaf_recomputes() {
        let prev = json!({"x": [1, 2]});
        let next = json!({"x": [1, 3]});
        assert!(same_shape(&prev, &next));
        assert!(should_recompute(Some(&prev), None, Some(&next), None));
    }

    #[test]
    fn test_presence_change_recomputes() {
        let v = json!(1);
        assert!(should_recompute(None, None, Some(&v), None));
        assert!(should_recompute(Some(&v), Some(&v), Some(&v), None));
    }

    #[test]
    fn test_fingerprint_tracks_shape_only() {
        let a = ShapeFingerprint::of(&json!({"a": 1, "b": [true]}));
        let b = ShapeFingerprint::of(&json!({"b": ["s"], "a": null}));
        let c = ShapeFingerprint::of(&json!({"a": 1, "b": [true, false]}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(
            ShapeFingerprint::of(&json!({"ab": {"c": 1}})),
            ShapeFingerprint::of(&json!({"a": {"bc": 1}}))
        );
    }

    #[test]
    fn test_memo_hits_on_equal_inputs() {
        let mut memo = DiffMemo::default();
        let a = json!({"n": 1});
        let b = json!({"n": 2});

        let first = memo.diff(Some(&a), Some(&b)).unwrap();
        let second = memo.diff(Some(&a.clone()), Some(&b.clone())).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(memo.hits(), 1);
        assert_eq!(memo.misses(), 1);

        let third = memo.diff(Some(&a), Some(&json!({"n": 3}))).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(memo.misses(), 2);
    }

    #[test]
    fn test_memo_fingerprints_only_on_miss() {
        let mut memo = DiffMemo::default();
        assert!(memo.cached_shapes().is_none());

        let a = json!({"n": [1, 2]});
        memo.diff(Some(&a), None).unwrap();
        let expected = ShapeFingerprint::of(&a);
        assert_eq!(memo.cached_shapes(), Some((Some(&expected), None)));

        // same shape, different leaf: a miss that refreshes the slot
        let next = json!({"n": [1, 3]});
        memo.diff(Some(&next), None).unwrap();
        assert_eq!(memo.misses(), 2);
        assert_eq!(memo.cached_shapes(), Some((Some(&expected), None)));

        memo.diff(Some(&next.clone()), None).unwrap();
        assert_eq!(memo.hits(), 1);
    }

    #[test]
    fn test_memo_option_change_clears_slot() {
        let mut memo = DiffMemo::default();
        let a = json!({"n": ""});
        memo.diff(Some(&a), Some(&a)).unwrap();
        memo.set_options(NormalizeOptions::hiding_empty());
        memo.diff(Some(&a), Some(&a)).unwrap();
        assert_eq!(memo.misses(), 2);
        assert_eq!(memo.hits(), 0);
    }
}
