//! Structural diff computation.
//!
//! [`diff`] compares two normalized values; [`compute_diff`] normalizes raw
//! payloads first. Both are pure: no state survives between calls.
//!
//! Rules:
//! - scalars: `Unchanged` if equal, else `Changed { old, new }`
//! - mappings: union of keys; one-sided keys are `Removed` (left) or `Added` (right)
//! - sequences: index-aligned, no content matching; the longer side's tail is
//!   wholesale `Added` or `Removed`
//! - kind mismatch: `Replaced { removed, added }`
//! - an absent side behaves as an empty container of the other side's kind

use crate::diff::model::{DiffNode, DiffTree};
use crate::errors::Result;
use crate::normalize::{normalize_optional, NormalizeOptions, NormalizedValue};
use crate::{log_op_end, log_op_start};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Diff two normalized values; `None` is an absent payload
pub fn diff(a: Option<&NormalizedValue>, b: Option<&NormalizedValue>) -> DiffTree {
    DiffTree::new(diff_node(a, b))
}

/// Normalize two raw payloads and diff them
///
/// # Errors
///
/// `DepthExceeded` if either payload cannot be normalized.
pub fn compute_diff(
    a: Option<&Value>,
    b: Option<&Value>,
    options: &NormalizeOptions,
) -> Result<DiffTree> {
    let start = Instant::now();
    log_op_start!("compute_diff", hide_empty = options.hide_empty);

    let a = normalize_optional(a, options)?;
    let b = normalize_optional(b, options)?;
    let tree = diff(a.as_ref(), b.as_ref());

    log_op_end!(
        "compute_diff",
        duration_ms = start.elapsed().as_millis() as u64,
        changed_count = tree.summary.differences() as u64
    );
    Ok(tree)
}

fn diff_node(a: Option<&NormalizedValue>, b: Option<&NormalizedValue>) -> DiffNode {
    match (a, b) {
        (None, None) => DiffNode::Unchanged {
            value: NormalizedValue::null(),
        },
        (None, Some(b)) => one_sided(b, Side::Added),
        (Some(a), None) => one_sided(a, Side::Removed),
        (Some(a), Some(b)) => diff_present(a, b),
    }
}

#[derive(Clone, Copy)]
enum Side {
    Added,
    Removed,
}

impl Side {
    fn wrap(self, value: NormalizedValue) -> DiffNode {
        match self {
            Side::Added => DiffNode::Added { value },
            Side::Removed => DiffNode::Removed { value },
        }
    }
}

/// Diff against an empty container of the same kind
fn one_sided(value: &NormalizedValue, side: Side) -> DiffNode {
    match value {
        NormalizedValue::Mapping(entries) => DiffNode::Mapping {
            entries: entries
                .iter()
                .map(|(k, v)| (k.clone(), side.wrap(v.clone())))
                .collect(),
        },
        NormalizedValue::Sequence(items) => DiffNode::Sequence {
            items: items.iter().map(|v| side.wrap(v.clone())).collect(),
        },
        NormalizedValue::Scalar(_) => side.wrap(value.clone()),
    }
}

fn diff_present(a: &NormalizedValue, b: &NormalizedValue) -> DiffNode {
    match (a, b) {
        (NormalizedValue::Scalar(x), NormalizedValue::Scalar(y)) => {
            if x == y {
                DiffNode::Unchanged { value: a.clone() }
            } else {
                DiffNode::Changed {
                    old: a.clone(),
                    new: b.clone(),
                }
            }
        }
        (NormalizedValue::Mapping(x), NormalizedValue::Mapping(y)) => diff_mappings(x, y),
        (NormalizedValue::Sequence(x), NormalizedValue::Sequence(y)) => diff_sequences(x, y),
        _ => DiffNode::Replaced {
            removed: a.clone(),
            added: b.clone(),
        },
    }
}

fn diff_mappings(
    a: &BTreeMap<String, NormalizedValue>,
    b: &BTreeMap<String, NormalizedValue>,
) -> DiffNode {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();

    let entries = keys
        .into_iter()
        .map(|key| {
            let node = match (a.get(key), b.get(key)) {
                (Some(x), Some(y)) => diff_present(x, y),
                (Some(x), None) => DiffNode::Removed { value: x.clone() },
                (None, Some(y)) => DiffNode::Added { value: y.clone() },
                (None, None) => unreachable!("key comes from one of the two maps"),
            };
            (key.clone(), node)
        })
        .collect();

    DiffNode::Mapping { entries }
}

// Index-aligned on purpose: an insertion in the middle shows up as a run of
// changes plus a trailing addition.
fn diff_sequences(a: &[NormalizedValue], b: &[NormalizedValue]) -> DiffNode {
    let len = a.len().max(b.len());
    let items = (0..len)
        .map(|i| match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => diff_present(x, y),
            (Some(x), None) => DiffNode::Removed { value: x.clone() },
            (None, Some(y)) => DiffNode::Added { value: y.clone() },
            (None, None) => unreachable!("index is below the longer length"),
        })
        .collect();

    DiffNode::Sequence { items }
}
