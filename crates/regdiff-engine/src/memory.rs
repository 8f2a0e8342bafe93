//! In-memory `ObjectSource`
//!
//! Holds an immutable snapshot of `(path, value)` objects in store order.
//! Indices are keyed by predicate key, created on first request and scanned
//! incrementally: by a tokio task in `Background` mode, or by explicit
//! [`MemoryObjectSource::step`] calls in `Manual` mode.

use crate::source::{BuildState, IndexHandle, IndexStatus, ObjectSource, Predicate};
use async_trait::async_trait;
use regdiff_core::errors::{ExError, ExErrorKind};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// How indices get built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// A spawned task scans `batch_size` objects per step, yielding in between
    Background { batch_size: usize },
    /// Nothing is scanned until the caller steps the index
    Manual,
}

struct IndexState {
    predicate: Predicate,
    scanned: usize,
    matches: Vec<String>,
    state: BuildState,
}

impl IndexState {
    fn new(predicate: Predicate, total: usize) -> Self {
        Self {
            predicate,
            scanned: 0,
            matches: Vec::new(),
            state: if total == 0 {
                BuildState::Complete
            } else {
                BuildState::Building
            },
        }
    }

    /// Scan up to `n` more objects
    fn advance(&mut self, objects: &[(String, Value)], n: usize) {
        if self.state != BuildState::Building {
            return;
        }
        let end = (self.scanned + n).min(objects.len());
        for (path, value) in &objects[self.scanned..end] {
            let verdict = panic::catch_unwind(AssertUnwindSafe(|| {
                self.predicate.evaluate(path, value)
            }))
            .unwrap_or_else(|payload| Err(panic_reason(payload.as_ref())));
            match verdict {
                Ok(true) => self.matches.push(path.clone()),
                Ok(false) => {}
                Err(reason) => {
                    tracing::warn!(
                        index_id = self.predicate.key(),
                        object_path = %path,
                        reason = %reason,
                        "predicate failed, treating object as non-match"
                    );
                }
            }
        }
        self.scanned = end;
        if self.scanned == objects.len() {
            self.state = BuildState::Complete;
        }
    }

    fn status(&self, total: usize) -> IndexStatus {
        match self.state {
            BuildState::Complete => IndexStatus::complete(self.matches.len()),
            BuildState::Failed => IndexStatus::failed(),
            BuildState::Building => {
                IndexStatus::building(self.matches.len(), self.scanned as f64 / total as f64)
            }
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|m| m.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("predicate panicked: {}", message)
}

type SharedIndex = Arc<Mutex<IndexState>>;

struct Store {
    objects: Vec<(String, Value)>,
    by_path: HashMap<String, usize>,
    unreadable: Mutex<BTreeSet<String>>,
    indices: Mutex<HashMap<String, SharedIndex>>,
    index_unavailable: AtomicBool,
}

/// Host stand-in over an in-memory snapshot
#[derive(Clone)]
pub struct MemoryObjectSource {
    store: Arc<Store>,
    mode: BuildMode,
}

fn lock_poisoned(op: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message("index lock poisoned")
}

impl MemoryObjectSource {
    /// Snapshot of `objects` in the given order
    ///
    /// A later duplicate path shadows the earlier one for data lookups; both
    /// stay in store order for index scans.
    pub fn new(objects: Vec<(String, Value)>, mode: BuildMode) -> Self {
        let by_path = objects
            .iter()
            .enumerate()
            .map(|(i, (path, _))| (path.clone(), i))
            .collect();
        Self {
            store: Arc::new(Store {
                objects,
                by_path,
                unreadable: Mutex::new(BTreeSet::new()),
                indices: Mutex::new(HashMap::new()),
                index_unavailable: AtomicBool::new(false),
            }),
            mode,
        }
    }

    pub fn background(objects: Vec<(String, Value)>, batch_size: usize) -> Self {
        Self::new(
            objects,
            BuildMode::Background {
                batch_size: batch_size.max(1),
            },
        )
    }

    pub fn manual(objects: Vec<(String, Value)>) -> Self {
        Self::new(objects, BuildMode::Manual)
    }

    /// Make fetches of `path` fail (the path reads back as `None`)
    pub fn with_unreadable(self, path: impl Into<String>) -> Self {
        self.mark_unreadable(path);
        self
    }

    pub fn mark_unreadable(&self, path: impl Into<String>) {
        if let Ok(mut unreadable) = self.store.unreadable.lock() {
            unreadable.insert(path.into());
        }
    }

    /// Simulate an index service outage for new index requests
    pub fn set_index_unavailable(&self, unavailable: bool) {
        self.store
            .index_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.store.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.objects.is_empty()
    }

    /// Scan `n` more objects of a manually built index
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown handle.
    pub fn step(&self, handle: &IndexHandle, n: usize) -> Result<IndexStatus, ExError> {
        let index = self.index(handle, "step")?;
        let mut state = index.lock().map_err(|_| lock_poisoned("step"))?;
        state.advance(&self.store.objects, n);
        Ok(state.status(self.store.objects.len()))
    }

    /// Scan the rest of a manually built index
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown handle.
    pub fn finish(&self, handle: &IndexHandle) -> Result<IndexStatus, ExError> {
        self.step(handle, self.store.objects.len())
    }

    fn index(&self, handle: &IndexHandle, op: &str) -> Result<SharedIndex, ExError> {
        let indices = self
            .store
            .indices
            .lock()
            .map_err(|_| lock_poisoned(op))?;
        indices.get(handle.as_str()).cloned().ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op(op)
                .with_entity_id(handle.as_str())
                .with_message("unknown index handle")
        })
    }

    fn spawn_build(&self, index: SharedIndex, batch_size: usize) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            loop {
                let done = match index.lock() {
                    Ok(mut state) => {
                        state.advance(&store.objects, batch_size);
                        state.state != BuildState::Building
                    }
                    Err(_) => true,
                };
                if done {
                    break;
                }
                tokio::task::yield_now().await;
            }
        });
    }
}

#[async_trait]
impl ObjectSource for MemoryObjectSource {
    async fn get_object_data(
        &self,
        paths: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Option<Value>>, ExError> {
        let unreadable = self
            .store
            .unreadable
            .lock()
            .map_err(|_| lock_poisoned("get_object_data"))?;
        Ok(paths
            .iter()
            .map(|path| {
                let data = if unreadable.contains(path) {
                    tracing::warn!(object_path = %path, "object could not be read");
                    None
                } else {
                    self.store
                        .by_path
                        .get(path)
                        .map(|&i| self.store.objects[i].1.clone())
                };
                (path.clone(), data)
            })
            .collect())
    }

    async fn get_filtered_index(
        &self,
        predicate: Predicate,
    ) -> Result<(IndexHandle, IndexStatus), ExError> {
        if self.store.index_unavailable.load(Ordering::SeqCst) {
            return Err(ExError::new(ExErrorKind::IndexUnavailable)
                .with_op("get_filtered_index")
                .with_entity_id(predicate.key())
                .with_message("index service unavailable"));
        }

        let handle = IndexHandle::new(predicate.key());
        let total = self.store.objects.len();

        let (index, created) = {
            let mut indices = self
                .store
                .indices
                .lock()
                .map_err(|_| lock_poisoned("get_filtered_index"))?;
            match indices.get(predicate.key()) {
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    let index = Arc::new(Mutex::new(IndexState::new(predicate, total)));
                    indices.insert(handle.as_str().to_string(), Arc::clone(&index));
                    (index, true)
                }
            }
        };

        if created {
            tracing::debug!(index_id = %handle, objects = total, "created filtered index");
            if let BuildMode::Background { batch_size } = self.mode {
                self.spawn_build(Arc::clone(&index), batch_size);
            }
        }

        let status = index
            .lock()
            .map_err(|_| lock_poisoned("get_filtered_index"))?
            .status(total);
        Ok((handle, status))
    }

    async fn index_status(&self, handle: &IndexHandle) -> Result<IndexStatus, ExError> {
        let index = self.index(handle, "index_status")?;
        let state = index.lock().map_err(|_| lock_poisoned("index_status"))?;
        Ok(state.status(self.store.objects.len()))
    }

    async fn get_path_at_index_position(
        &self,
        handle: &IndexHandle,
        position: usize,
    ) -> Result<Option<String>, ExError> {
        let index = self.index(handle, "get_path_at_index_position")?;
        let state = index
            .lock()
            .map_err(|_| lock_poisoned("get_path_at_index_position"))?;
        Ok(state.matches.get(position).cloned())
    }
}
