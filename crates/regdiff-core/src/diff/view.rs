//! Consumer-side display filter over a diff tree.
//!
//! The differ always keeps unchanged subtrees. Whether they are shown is
//! decided here, per call, through `show_unchanged`.

use crate::diff::model::{DiffNode, DiffStatus, DiffTree};
use crate::normalize::NormalizedValue;
use crate::path::ValuePath;
use serde::Serialize;

/// One flattened leaf of a diff tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub path: ValuePath,
    pub status: DiffStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<NormalizedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<NormalizedValue>,
}

/// Flatten a tree into leaf rows, depth-first in key/index order
///
/// A `Replaced` leaf yields a `removed` row followed by an `added` row for
/// the same path.
pub fn entries(tree: &DiffTree, show_unchanged: bool) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    collect(&tree.root, &mut ValuePath::root(), show_unchanged, &mut out);
    out
}

fn collect(node: &DiffNode, path: &mut ValuePath, show_unchanged: bool, out: &mut Vec<DiffEntry>) {
    let mut row = |status, old: Option<&NormalizedValue>, new: Option<&NormalizedValue>| {
        out.push(DiffEntry {
            path: path.clone(),
            status,
            old: old.cloned(),
            new: new.cloned(),
        })
    };

    match node {
        DiffNode::Unchanged { value } => {
            if show_unchanged {
                row(DiffStatus::Unchanged, Some(value), Some(value));
            }
        }
        DiffNode::Added { value } => row(DiffStatus::Added, None, Some(value)),
        DiffNode::Removed { value } => row(DiffStatus::Removed, Some(value), None),
        DiffNode::Changed { old, new } => row(DiffStatus::Changed, Some(old), Some(new)),
        DiffNode::Replaced { removed, added } => {
            row(DiffStatus::Removed, Some(removed), None);
            row(DiffStatus::Added, None, Some(added));
        }
        DiffNode::Mapping { entries } => {
            for (key, child) in entries {
                path.push(crate::path::PathSegment::Key(key.clone()));
                collect(child, path, show_unchanged, out);
                path.pop();
            }
        }
        DiffNode::Sequence { items } => {
            for (index, child) in items.iter().enumerate() {
                path.push(crate::path::PathSegment::Index(index));
                collect(child, path, show_unchanged, out);
                path.pop();
            }
        }
    }
}
