//! Diff tree types.
//!
//! A [`DiffNode`] tree mirrors the union of the two compared normalized
//! values. Containers present on both sides become `Mapping`/`Sequence`
//! nodes holding one child per key or index; every other position is a leaf
//! classification. Unchanged subtrees are kept in full: hiding them is the
//! consumer's display decision (see [`crate::diff::view`]).

use crate::normalize::NormalizedValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Classification of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Unchanged,
    Added,
    Removed,
    Changed,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStatus::Unchanged => "unchanged",
            DiffStatus::Added => "added",
            DiffStatus::Removed => "removed",
            DiffStatus::Changed => "changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiffNode {
    /// Equal on both sides
    Unchanged { value: NormalizedValue },

    /// Only on the right side
    Added { value: NormalizedValue },

    /// Only on the left side
    Removed { value: NormalizedValue },

    /// Scalars on both sides with different values
    Changed {
        old: NormalizedValue,
        new: NormalizedValue,
    },

    /// Different kinds on each side: the left value is removed and the right
    /// one added, with no attempt to merge them
    Replaced {
        removed: NormalizedValue,
        added: NormalizedValue,
    },

    /// Mapping on both sides, one child per key of the union
    Mapping { entries: BTreeMap<String, DiffNode> },

    /// Sequence on both sides, one child per index of the longer one
    Sequence { items: Vec<DiffNode> },
}

impl DiffNode {
    /// Overall classification; containers are `Changed` if any child is not unchanged
    pub fn status(&self) -> DiffStatus {
        match self {
            DiffNode::Unchanged { .. } => DiffStatus::Unchanged,
            DiffNode::Added { .. } => DiffStatus::Added,
            DiffNode::Removed { .. } => DiffStatus::Removed,
            DiffNode::Changed { .. } | DiffNode::Replaced { .. } => DiffStatus::Changed,
            DiffNode::Mapping { entries } => container_status(entries.values()),
            DiffNode::Sequence { items } => container_status(items.iter()),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.status() == DiffStatus::Unchanged
    }

    /// Child node under a mapping key
    pub fn entry(&self, key: &str) -> Option<&DiffNode> {
        match self {
            DiffNode::Mapping { entries } => entries.get(key),
            _ => None,
        }
    }

    /// Child node at a sequence index
    pub fn item(&self, index: usize) -> Option<&DiffNode> {
        match self {
            DiffNode::Sequence { items } => items.get(index),
            _ => None,
        }
    }

    /// Walk a dotted key path (`"b.c"`) through mapping nodes
    pub fn at(&self, dotted: &str) -> Option<&DiffNode> {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, key| match key.parse::<usize>() {
                Ok(index) if matches!(node, DiffNode::Sequence { .. }) => node.item(index),
                _ => node.entry(key),
            })
    }
}

fn container_status<'a>(children: impl Iterator<Item = &'a DiffNode>) -> DiffStatus {
    let mut children = children;
    if children.all(DiffNode::is_unchanged) {
        DiffStatus::Unchanged
    } else {
        DiffStatus::Changed
    }
}

/// Leaf-level counts over a diff tree
///
/// A `Replaced` node counts once as removed and once as added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    pub fn of(node: &DiffNode) -> Self {
        let mut summary = DiffSummary::default();
        summary.tally(node);
        summary
    }

    fn tally(&mut self, node: &DiffNode) {
        match node {
            DiffNode::Unchanged { .. } => self.unchanged += 1,
            DiffNode::Added { .. } => self.added += 1,
            DiffNode::Removed { .. } => self.removed += 1,
            DiffNode::Changed { .. } => self.changed += 1,
            DiffNode::Replaced { .. } => {
                self.removed += 1;
                self.added += 1;
            }
            DiffNode::Mapping { entries } => entries.values().for_each(|n| self.tally(n)),
            DiffNode::Sequence { items } => items.iter().for_each(|n| self.tally(n)),
        }
    }

    /// Number of leaves that are not unchanged
    pub fn differences(&self) -> usize {
        self.added + self.removed + self.changed
    }
}

/// Result of one comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffTree {
    pub root: DiffNode,
    pub status: DiffStatus,
    pub summary: DiffSummary,
}

impl DiffTree {
    pub fn new(root: DiffNode) -> Self {
        let status = root.status();
        let summary = DiffSummary::of(&root);
        Self {
            root,
            status,
            summary,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.status != DiffStatus::Unchanged
    }
}
