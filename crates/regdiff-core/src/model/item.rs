//! Register item domain model
//!
//! A register item is a versioned record. Its history is a revision tree:
//! every revision names zero or more parents, merges are allowed, cycles are
//! not. Exactly one revision is current.

use crate::errors::{RegDiffError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Lifecycle status of an item as recorded in a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Submitted,
    Valid,
    Superseded,
    Retired,
    Invalid,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Submitted => "submitted",
            ItemStatus::Valid => "valid",
            ItemStatus::Superseded => "superseded",
            ItemStatus::Retired => "retired",
            ItemStatus::Invalid => "invalid",
        }
    }
}

/// One node of an item's revision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub parents: Vec<String>,

    pub status: ItemStatus,

    /// Item data as of this revision
    #[serde(default)]
    pub payload: Value,

    /// Change request whose acceptance produced this revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_request_id: Option<String>,

    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterItem {
    pub id: String,

    /// Item class identifier (e.g. `coordinate-ops--conversion`)
    pub class_id: String,

    /// Key of the current revision in `revisions`
    pub current_revision: String,

    pub revisions: BTreeMap<String, Revision>,
}

/// Object-store path of an item: `/<class>/<id>.yaml`
pub fn item_path(class_id: &str, item_id: &str) -> String {
    format!("/{}/{}.yaml", class_id, item_id)
}

impl RegisterItem {
    pub fn path(&self) -> String {
        item_path(&self.class_id, &self.id)
    }

    /// Check the revision tree invariants
    ///
    /// # Errors
    ///
    /// - `EmptyRevisionTree` when there are no revisions
    /// - `CurrentRevisionMissing` when `current_revision` is not a key
    /// - `UnknownParentRevision` when a parent id is not a key
    /// - `RevisionCycle` when parent links form a cycle
    pub fn validate(&self) -> Result<()> {
        if self.revisions.is_empty() {
            return Err(RegDiffError::EmptyRevisionTree {
                item_id: self.id.clone(),
            });
        }

        if !self.revisions.contains_key(&self.current_revision) {
            return Err(RegDiffError::CurrentRevisionMissing {
                item_id: self.id.clone(),
                revision_id: self.current_revision.clone(),
            });
        }

        for (revision_id, revision) in &self.revisions {
            if let Some(parent_id) = revision
                .parents
                .iter()
                .find(|p| !self.revisions.contains_key(p.as_str()))
            {
                return Err(RegDiffError::UnknownParentRevision {
                    item_id: self.id.clone(),
                    revision_id: revision_id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }

        self.check_acyclic()
    }

    /// Iterative three-colour DFS over parent links
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();

        for start in self.revisions.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            // (revision, index of next parent to visit)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            marks.insert(start.as_str(), Mark::Visiting);

            while let Some((current, next_parent)) = stack.pop() {
                let parents = self
                    .revisions
                    .get(current)
                    .map(|r| r.parents.as_slice())
                    .unwrap_or(&[]);

                if let Some(parent) = parents.get(next_parent) {
                    stack.push((current, next_parent + 1));
                    match marks.get(parent.as_str()) {
                        Some(Mark::Visiting) => {
                            return Err(RegDiffError::RevisionCycle {
                                item_id: self.id.clone(),
                                revision_id: parent.clone(),
                            });
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(parent.as_str(), Mark::Visiting);
                            stack.push((parent.as_str(), 0));
                        }
                    }
                } else {
                    marks.insert(current, Mark::Done);
                }
            }
        }

        Ok(())
    }

    /// # Errors
    ///
    /// `RevisionNotFound` if the id is not in the tree.
    pub fn revision(&self, revision_id: &str) -> Result<&Revision> {
        self.revisions
            .get(revision_id)
            .ok_or_else(|| RegDiffError::RevisionNotFound {
                item_id: self.id.clone(),
                revision_id: revision_id.to_string(),
            })
    }

    /// # Errors
    ///
    /// `CurrentRevisionMissing` if the current pointer dangles.
    pub fn current(&self) -> Result<&Revision> {
        self.revisions
            .get(&self.current_revision)
            .ok_or_else(|| RegDiffError::CurrentRevisionMissing {
                item_id: self.id.clone(),
                revision_id: self.current_revision.clone(),
            })
    }

    /// Ancestors of a revision, nearest first
    ///
    /// Breadth-first over parent links; parents are visited in the order they
    /// are listed, each revision at most once. The starting revision is not
    /// included.
    ///
    /// # Errors
    ///
    /// `RevisionNotFound` if `revision_id` is not in the tree.
    pub fn ancestry(&self, revision_id: &str) -> Result<Vec<&str>> {
        let start = self.revision(revision_id)?;

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        seen.insert(revision_id);
        let mut queue: VecDeque<&str> = start.parents.iter().map(String::as_str).collect();
        let mut out = Vec::new();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(rev) = self.revisions.get(id) {
                queue.extend(rev.parents.iter().map(String::as_str));
            }
        }

        Ok(out)
    }

    /// Revisions with no parents, in key order
    pub fn roots(&self) -> Vec<&str> {
        self.revisions
            .iter()
            .filter(|(_, r)| r.parents.is_empty())
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
