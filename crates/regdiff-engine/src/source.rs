//! Host capability consumed by the engine
//!
//! The host owns the object store and builds filtered indices. The engine
//! only holds handles and asks for positions and data on demand; every call
//! here is a suspension point.

use async_trait::async_trait;
use regdiff_core::errors::ExError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a host-built filtered index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexHandle(String);

impl IndexHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an index build
///
/// `Building` moves to `Complete` or `Failed` and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Building,
    Complete,
    Failed,
}

/// Live view of an index build
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    /// Matches found so far; never decreases
    pub match_count: usize,
    /// Fraction of the store scanned, in `[0, 1]`
    pub build_progress: f64,
    pub state: BuildState,
}

impl IndexStatus {
    pub fn building(match_count: usize, build_progress: f64) -> Self {
        Self {
            match_count,
            build_progress: build_progress.clamp(0.0, 1.0),
            state: BuildState::Building,
        }
    }

    pub fn complete(match_count: usize) -> Self {
        Self {
            match_count,
            build_progress: 1.0,
            state: BuildState::Complete,
        }
    }

    /// Status standing in for an index the host could not provide
    pub fn failed() -> Self {
        Self {
            match_count: 0,
            build_progress: 0.0,
            state: BuildState::Failed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == BuildState::Complete
    }

    pub fn is_failed(&self) -> bool {
        self.state == BuildState::Failed
    }

    /// No more matches will ever appear
    pub fn is_terminal(&self) -> bool {
        self.state != BuildState::Building
    }
}

/// Signature of a host-evaluated predicate
///
/// `Err` means the predicate could not be evaluated for that object; the
/// host treats it as a non-match.
pub type PredicateFn = dyn Fn(&str, &Value) -> Result<bool, String> + Send + Sync;

/// Typed predicate capability passed to the host
///
/// `key` identifies the predicate: the host reuses an existing index when it
/// sees the same key again.
#[derive(Clone)]
pub struct Predicate {
    key: String,
    check: Arc<PredicateFn>,
}

impl Predicate {
    pub fn new<F>(key: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            check: Arc::new(check),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// # Errors
    ///
    /// Whatever the predicate reports for this object.
    pub fn evaluate(&self, path: &str, value: &Value) -> Result<bool, String> {
        (self.check)(path, value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("key", &self.key).finish()
    }
}

/// Object store and index capability provided by the host
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Fetch parsed data for a set of paths
    ///
    /// Every requested path is present in the result; `None` marks a path
    /// whose data is missing or failed to load.
    async fn get_object_data(
        &self,
        paths: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Option<Value>>, ExError>;

    /// Get (creating on first use) the index for a predicate
    ///
    /// Returns at once; the build continues in the background.
    async fn get_filtered_index(
        &self,
        predicate: Predicate,
    ) -> Result<(IndexHandle, IndexStatus), ExError>;

    /// Current build status of an index
    async fn index_status(&self, handle: &IndexHandle) -> Result<IndexStatus, ExError>;

    /// Path at a position of an index
    ///
    /// Positions at or past the current match count yield `None`. A position
    /// that once resolved keeps resolving to the same path.
    async fn get_path_at_index_position(
        &self,
        handle: &IndexHandle,
        position: usize,
    ) -> Result<Option<String>, ExError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicate_evaluates_and_keeps_key() {
        let p = Predicate::new("has-name", |_, v: &Value| Ok(v.get("name").is_some()));
        assert_eq!(p.key(), "has-name");
        assert_eq!(p.evaluate("/a", &json!({"name": 1})), Ok(true));
        assert_eq!(p.evaluate("/a", &json!({})), Ok(false));
        assert!(format!("{:?}", p).contains("has-name"));
    }

    #[test]
    fn test_status_constructors() {
        assert!(IndexStatus::complete(3).is_terminal());
        assert!(IndexStatus::failed().is_failed());
        assert!(!IndexStatus::building(1, 0.5).is_terminal());
        assert_eq!(IndexStatus::building(0, 7.0).build_progress, 1.0);
    }
}
