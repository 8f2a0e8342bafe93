use regdiff_core::config::HistoryConfig;
use regdiff_engine::{HistoryResolver, MemoryObjectSource};
use serde_json::{json, Value};
use std::sync::Arc;

pub const ITEM_X: &str = "/units/x.yaml";
pub const ITEM_Y: &str = "/units/y.yaml";

/// Change request document touching the given items with clarifications
pub fn change_request(id: &str, disposition: &str, items: &[&str]) -> Value {
    let proposals: serde_json::Map<String, Value> = items
        .iter()
        .map(|path| {
            (
                path.to_string(),
                json!({"type": "clarification", "payload": {"name": format!("{} edit", id)}}),
            )
        })
        .collect();
    json!({
        "id": id,
        "justification": format!("Justification for {}", id),
        "state": "proposed",
        "disposition": disposition,
        "timeProposed": "2026-04-01T12:00:00Z",
        "items": proposals,
    })
}

pub fn cr_path(id: &str) -> String {
    format!("/proposals/{}/main.yaml", id)
}

/// Register item with a two-revision linear history
pub fn register_item(id: &str) -> Value {
    json!({
        "id": id,
        "classId": "units",
        "currentRevision": "r2",
        "revisions": {
            "r1": {
                "timestamp": "2026-01-01T00:00:00Z",
                "status": "valid",
                "payload": {"name": "metre", "symbol": "m", "aliases": ["meter"]},
                "author": "alice"
            },
            "r2": {
                "timestamp": "2026-02-01T00:00:00Z",
                "parents": ["r1"],
                "status": "valid",
                "payload": {"name": "metre", "symbol": "m", "aliases": ["meter", "mtr"], "note": ""},
                "changeRequestId": "cr-1",
                "author": "bob"
            }
        }
    })
}

/// Store with five visible CRs touching X, interleaved with noise
#[allow(dead_code)]
pub fn five_match_store() -> Vec<(String, Value)> {
    let mut objects = Vec::new();
    for i in 0..5 {
        let id = format!("cr-{}", i);
        objects.push((cr_path(&id), change_request(&id, "accepted", &[ITEM_X])));
        let other = format!("cr-other-{}", i);
        objects.push((cr_path(&other), change_request(&other, "accepted", &[ITEM_Y])));
    }
    objects.push((ITEM_X.to_string(), register_item("x")));
    objects
}

#[allow(dead_code)]
pub fn history_config(page_size: usize) -> HistoryConfig {
    HistoryConfig {
        page_size,
        poll_interval_ms: 1,
        ..HistoryConfig::default()
    }
}

#[allow(dead_code)]
pub fn resolver(source: &MemoryObjectSource, page_size: usize) -> HistoryResolver {
    HistoryResolver::new(Arc::new(source.clone()), history_config(page_size))
}
