#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use async_trait::async_trait;
use futures::StreamExt;
use regdiff_core::errors::{ExError, ExErrorKind};
use regdiff_core::logging_facility::test_capture::init_test_capture;
use regdiff_engine::{
    BuildState, HistoryResolver, IndexHandle, IndexStatus, MemoryObjectSource, ObjectSource,
    Predicate,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// Host whose position lookup fails at one position
struct BrokenPositionSource {
    inner: MemoryObjectSource,
    broken: usize,
}

#[async_trait]
impl ObjectSource for BrokenPositionSource {
    async fn get_object_data(
        &self,
        paths: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Option<Value>>, ExError> {
        self.inner.get_object_data(paths).await
    }

    async fn get_filtered_index(
        &self,
        predicate: Predicate,
    ) -> Result<(IndexHandle, IndexStatus), ExError> {
        self.inner.get_filtered_index(predicate).await
    }

    async fn index_status(&self, handle: &IndexHandle) -> Result<IndexStatus, ExError> {
        self.inner.index_status(handle).await
    }

    async fn get_path_at_index_position(
        &self,
        handle: &IndexHandle,
        position: usize,
    ) -> Result<Option<String>, ExError> {
        if position == self.broken {
            return Err(ExError::new(ExErrorKind::FetchFailed).with_message("position lookup down"));
        }
        self.inner.get_path_at_index_position(handle, position).await
    }
}

fn ids(entries: &[regdiff_engine::HistoryEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.summary.as_ref().map(|s| s.id.clone()).unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_history_excludes_withdrawn_and_not_accepted() {
    let source = MemoryObjectSource::background(
        vec![
            (cr_path("A"), change_request("A", "accepted", &[ITEM_X])),
            (cr_path("B"), change_request("B", "withdrawn", &[ITEM_X])),
            (cr_path("C"), change_request("C", "undetermined", &[ITEM_X, ITEM_Y])),
            (cr_path("D"), change_request("D", "notAccepted", &[ITEM_X])),
            (cr_path("E"), change_request("E", "accepted", &[ITEM_Y])),
            ("/proposals/junk.yaml".to_string(), json!("not a change request")),
            (ITEM_X.to_string(), register_item("x")),
        ],
        2,
    );
    let history = resolver(&source, 10).resolve_change_history(ITEM_X).await;

    let entries: Vec<_> = history.stream(0).collect().await;
    assert_eq!(ids(&entries), vec!["A", "C"]);
    assert_eq!(entries[0].position, 0);
    assert_eq!(entries[1].position, 1);
    assert_eq!(entries[1].path.as_deref(), Some(cr_path("C").as_str()));
    assert_eq!(history.status().await.state, BuildState::Complete);
}

#[tokio::test]
async fn test_partial_index_positions_are_empty_then_stable() {
    let source = MemoryObjectSource::manual(five_match_store());
    let history = resolver(&source, 10).resolve_change_history(ITEM_X).await;
    let handle = history.handle().unwrap().clone();

    // step one object at a time until exactly two matches exist
    let mut status = history.status().await;
    while status.match_count < 2 {
        status = source.step(&handle, 1).unwrap();
    }
    assert_eq!(status.match_count, 2);
    assert_eq!(status.state, BuildState::Building);

    assert_eq!(history.resolve_position(3).await, None);
    let early_first = history.resolve_position(0).await.unwrap();

    let page = history.page(0, 10).await;
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.next_position, 2);
    assert!(!page.complete);

    let status = source.finish(&handle).unwrap();
    assert_eq!(status.match_count, 5);

    let third = history.resolve_position(3).await.unwrap();
    assert_eq!(third, cr_path("cr-3"));
    assert_eq!(history.resolve_position(3).await.unwrap(), third);
    assert_eq!(history.resolve_position(0).await.unwrap(), early_first);

    let rest = history.page(page.next_position, 10).await;
    assert_eq!(ids(&rest.entries), vec!["cr-2", "cr-3", "cr-4"]);
    assert!(rest.complete);
}

#[tokio::test]
async fn test_paging_resumes_at_next_position() {
    let source = MemoryObjectSource::manual(five_match_store());
    let history = resolver(&source, 2).resolve_change_history(ITEM_X).await;
    source.finish(history.handle().unwrap()).unwrap();

    let mut seen = Vec::new();
    let mut position = 0;
    loop {
        let page = history.page(position, 2).await;
        seen.extend(ids(&page.entries));
        position = page.next_position;
        if page.complete {
            break;
        }
    }
    assert_eq!(seen, vec!["cr-0", "cr-1", "cr-2", "cr-3", "cr-4"]);
}

#[tokio::test]
async fn test_stream_waits_for_building_index() {
    let source = MemoryObjectSource::background(five_match_store(), 1);
    let history = resolver(&source, 2).resolve_change_history(ITEM_X).await;

    let entries: Vec<_> = history.stream(0).collect().await;
    let positions: Vec<usize> = entries.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);

    let resumed: Vec<_> = history.stream(3).collect().await;
    assert_eq!(ids(&resumed), vec!["cr-3", "cr-4"]);
}

#[tokio::test]
async fn test_same_item_reuses_index() {
    let source = MemoryObjectSource::manual(five_match_store());
    let resolver = resolver(&source, 10);
    let first = resolver.resolve_change_history(ITEM_X).await;
    source.step(first.handle().unwrap(), 4).unwrap();

    let second = resolver.resolve_change_history(ITEM_X).await;
    assert_eq!(first.handle(), second.handle());
    assert_eq!(second.status().await.match_count, 2);
}

#[tokio::test]
async fn test_fetch_failure_yields_placeholder() {
    let source = MemoryObjectSource::manual(five_match_store());
    let history = resolver(&source, 10).resolve_change_history(ITEM_X).await;
    source.finish(history.handle().unwrap()).unwrap();
    source.mark_unreadable(cr_path("cr-1"));

    let page = history.page(0, 10).await;
    assert_eq!(page.entries.len(), 5);
    assert!(page.entries[1].is_placeholder());
    assert_eq!(page.entries[1].path.as_deref(), Some(cr_path("cr-1").as_str()));
    assert_eq!(ids(&page.entries), vec!["cr-0", "", "cr-2", "cr-3", "cr-4"]);
    assert!(page.complete);
}

#[tokio::test]
async fn test_index_outage_is_an_empty_failed_history() {
    let capture = init_test_capture();
    let source = MemoryObjectSource::manual(five_match_store());
    source.set_index_unavailable(true);

    let history = resolver(&source, 10)
        .resolve_change_history("/units/outage.yaml")
        .await;
    assert!(history.handle().is_none());
    assert!(history.status().await.is_failed());

    let page = history.page(0, 10).await;
    assert!(page.entries.is_empty());
    assert!(page.complete);
    assert!(history.stream(0).collect::<Vec<_>>().await.is_empty());

    let warnings = capture.count_events(|e| {
        e.level == tracing::Level::WARN && e.field("err.code") == Some("ERR_INDEX_UNAVAILABLE")
    });
    assert!(warnings >= 1);
}

#[tokio::test]
async fn test_summary_carries_item_proposal_kind() {
    let source = MemoryObjectSource::manual(vec![(
        cr_path("A"),
        change_request("A", "accepted", &[ITEM_X, ITEM_Y]),
    )]);
    let history = resolver(&source, 10).resolve_change_history(ITEM_X).await;
    source.finish(history.handle().unwrap()).unwrap();

    let page = history.page(0, 1).await;
    let summary = page.entries[0].summary.as_ref().unwrap();
    assert_eq!(summary.object_path, cr_path("A"));
    assert_eq!(summary.proposal_count, 2);
    assert_eq!(summary.justification_excerpt, "Justification for A");
}

#[tokio::test]
async fn test_unresolvable_position_is_placeholder_and_history_ends() {
    let inner = MemoryObjectSource::manual(five_match_store());
    let source = Arc::new(BrokenPositionSource {
        inner: inner.clone(),
        broken: 1,
    });
    let history = HistoryResolver::new(source, history_config(2))
        .resolve_change_history(ITEM_X)
        .await;
    inner.finish(history.handle().unwrap()).unwrap();

    let page = history.page(0, 10).await;
    assert_eq!(page.entries.len(), 5);
    assert_eq!(page.next_position, 5);
    assert!(page.complete);
    assert!(page.entries[1].is_placeholder());
    assert_eq!(page.entries[1].path, None);
    assert_eq!(ids(&page.entries), vec!["cr-0", "", "cr-2", "cr-3", "cr-4"]);

    let streamed = tokio::time::timeout(Duration::from_secs(2), history.stream(0).collect::<Vec<_>>())
        .await
        .expect("stream should end once the index is complete");
    let positions: Vec<usize> = streamed.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
}
