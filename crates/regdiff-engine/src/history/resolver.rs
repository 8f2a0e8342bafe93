//! Change history resolution over a host-built filtered index.
//!
//! The resolver never fetches the full matching set. It asks the host for an
//! index of change requests touching an item, then walks index positions on
//! demand, fetching only the objects for the positions being shown.
//!
//! Failures are contained: an unavailable index reads as a `Failed`, empty
//! history; an object that cannot be fetched or parsed yields an entry with
//! no summary. Nothing is raised mid-stream.

use crate::source::{IndexHandle, IndexStatus, ObjectSource, Predicate};
use futures::stream::{self, BoxStream, StreamExt};
use regdiff_core::config::HistoryConfig;
use regdiff_core::model::{ChangeRequest, ChangeRequestSummary};
use regdiff_core::{log_op_end, log_op_start};
use regdiff_core_types::RequestContext;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One position of an item's change history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub position: usize,
    /// Object path of the change request; `None` if the position could not
    /// be resolved
    pub path: Option<String>,
    /// `None` when the change request could not be resolved, fetched or parsed
    pub summary: Option<ChangeRequestSummary>,
}

impl HistoryEntry {
    pub fn is_placeholder(&self) -> bool {
        self.summary.is_none()
    }
}

/// A window of history positions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    /// Index status observed when the page was read
    pub status: IndexStatus,
    /// Where the next page starts; pass back to resume
    pub next_position: usize,
    /// The index is terminal and every match up to it has been read
    pub complete: bool,
}

/// Builds change history views for items
pub struct HistoryResolver {
    source: Arc<dyn ObjectSource>,
    config: HistoryConfig,
}

impl HistoryResolver {
    pub fn new(source: Arc<dyn ObjectSource>, config: HistoryConfig) -> Self {
        Self { source, config }
    }

    /// Predicate selecting history-visible change requests that touch `item_path`
    ///
    /// Objects outside the change request prefix never match. Objects inside
    /// it that do not parse as change requests are predicate failures, which
    /// the host counts as non-matches.
    pub fn predicate_for(&self, item_path: &str) -> Predicate {
        let prefix = self.config.change_request_prefix.clone();
        let key = format!("change-history:{}:{}", prefix, item_path);
        let item_path = item_path.to_string();

        Predicate::new(key, move |object_path: &str, value: &Value| {
            if !object_path.starts_with(&prefix) {
                return Ok(false);
            }
            let cr: ChangeRequest = serde_json::from_value(value.clone())
                .map_err(|e| format!("not a change request: {}", e))?;
            Ok(cr.touches(&item_path) && cr.is_history_visible())
        })
    }

    /// Start (or rejoin) the change history of an item
    ///
    /// Returns immediately; the index may still be building.
    pub async fn resolve_change_history(&self, item_path: &str) -> ChangeHistory {
        let start = Instant::now();
        let context = RequestContext::new();
        log_op_start!(
            "resolve_change_history",
            request_id = context.request_id.as_str(),
            item_path = item_path
        );

        let handle = match self
            .source
            .get_filtered_index(self.predicate_for(item_path))
            .await
        {
            Ok((handle, status)) => {
                tracing::debug!(
                    index_id = %handle,
                    match_count = status.match_count,
                    build_progress = status.build_progress,
                    "history index ready"
                );
                Some(handle)
            }
            Err(err) => {
                tracing::warn!(
                    request_id = context.request_id.as_str(),
                    item_path = item_path,
                    err.code = err.code(),
                    error = %err,
                    "history index unavailable"
                );
                None
            }
        };

        log_op_end!(
            "resolve_change_history",
            duration_ms = start.elapsed().as_millis() as u64
        );

        ChangeHistory {
            source: Arc::clone(&self.source),
            context,
            handle,
            item_path: item_path.to_string(),
            page_size: self.config.page_size.max(1),
            poll_interval: self.config.poll_interval(),
        }
    }
}

/// Lazy, restartable view over one item's change history
///
/// Entries come in index position order, which is store order, not
/// chronological order.
#[derive(Clone)]
pub struct ChangeHistory {
    source: Arc<dyn ObjectSource>,
    context: RequestContext,
    handle: Option<IndexHandle>,
    item_path: String,
    page_size: usize,
    poll_interval: Duration,
}

impl ChangeHistory {
    pub fn item_path(&self) -> &str {
        &self.item_path
    }

    pub fn handle(&self) -> Option<&IndexHandle> {
        self.handle.as_ref()
    }

    /// Correlation context shared by every log event of this history
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Live index status; `Failed` if the host cannot report it
    pub async fn status(&self) -> IndexStatus {
        let Some(handle) = &self.handle else {
            return IndexStatus::failed();
        };
        match self.source.index_status(handle).await {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(index_id = %handle, error = %err, "index status unavailable");
                IndexStatus::failed()
            }
        }
    }

    /// Path at a history position, or `None` if not (yet) matched
    pub async fn resolve_position(&self, position: usize) -> Option<String> {
        let handle = self.handle.as_ref()?;
        match self.source.get_path_at_index_position(handle, position).await {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(
                    index_id = %handle,
                    position = position as u64,
                    error = %err,
                    "position lookup failed"
                );
                None
            }
        }
    }

    /// Read up to `limit` entries starting at `from`
    ///
    /// Returns what the index has matched so far; a short or empty page on a
    /// building index is not the end. Resume with `next_position`.
    ///
    /// Every position below the observed match count yields an entry, so a
    /// page over a complete index always reaches it. A position the host
    /// cannot resolve becomes a placeholder.
    pub async fn page(&self, from: usize, limit: usize) -> HistoryPage {
        let start = Instant::now();
        log_op_start!(
            "history_page",
            request_id = self.context.request_id.as_str(),
            item_path = self.item_path.as_str(),
            position = from as u64
        );

        let status = self.status().await;
        let end = from.saturating_add(limit).min(status.match_count);

        let mut paths = Vec::new();
        for position in from..end {
            paths.push((position, self.resolve_position(position).await));
        }

        let entries = self.summarize(paths).await;
        let next_position = from + entries.len();
        let complete = status.is_terminal() && next_position >= status.match_count;

        log_op_end!(
            "history_page",
            duration_ms = start.elapsed().as_millis() as u64,
            match_count = status.match_count as u64
        );

        HistoryPage {
            entries,
            status,
            next_position,
            complete,
        }
    }

    /// Fetch and summarize the change requests at the given positions
    async fn summarize(&self, paths: Vec<(usize, Option<String>)>) -> Vec<HistoryEntry> {
        let wanted: BTreeSet<String> = paths.iter().filter_map(|(_, p)| p.clone()).collect();
        if wanted.is_empty() {
            return paths
                .into_iter()
                .map(|(position, path)| HistoryEntry {
                    position,
                    path,
                    summary: None,
                })
                .collect();
        }

        let mut data = match self.source.get_object_data(&wanted).await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(
                    request_id = self.context.request_id.as_str(),
                    item_path = self.item_path.as_str(),
                    error = %err,
                    "change request fetch failed"
                );
                Default::default()
            }
        };

        paths
            .into_iter()
            .map(|(position, path)| {
                let summary = path.as_deref().and_then(|path| {
                    data.remove(path)
                        .flatten()
                        .and_then(|value| self.parse_summary(path, value))
                });
                HistoryEntry {
                    position,
                    path,
                    summary,
                }
            })
            .collect()
    }

    fn parse_summary(&self, path: &str, value: Value) -> Option<ChangeRequestSummary> {
        match serde_json::from_value::<ChangeRequest>(value) {
            Ok(cr) => Some(cr.summary(path, &self.item_path)),
            Err(err) => {
                tracing::warn!(object_path = path, error = %err, "change request did not parse");
                None
            }
        }
    }

    /// Stream entries from `from` onwards
    ///
    /// While the index is building the stream waits for it to grow, polling
    /// every `poll_interval`. It ends once the index is terminal and drained.
    /// Dropping the stream abandons the walk; the index itself is unaffected.
    pub fn stream(&self, from: usize) -> BoxStream<'static, HistoryEntry> {
        let history = self.clone();
        stream::unfold(
            (history, from, VecDeque::new()),
            |(history, mut position, mut buffer)| async move {
                loop {
                    if let Some(entry) = buffer.pop_front() {
                        return Some((entry, (history, position, buffer)));
                    }
                    let page = history.page(position, history.page_size).await;
                    if !page.entries.is_empty() {
                        position = page.next_position;
                        buffer.extend(page.entries);
                        continue;
                    }
                    if page.complete {
                        return None;
                    }
                    tokio::time::sleep(history.poll_interval).await;
                }
            },
        )
        .boxed()
    }
}
