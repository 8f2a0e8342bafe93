//! Revision and proposal comparison
//!
//! Loads payloads through the host, then hands them to the core differ.

use crate::source::ObjectSource;
use regdiff_core::diff::{compute_diff, DiffMemo, DiffTree};
use regdiff_core::errors::{ExError, ExErrorKind};
use regdiff_core::model::{ChangeProposal, ChangeRequest, ProposalKind, RegisterItem};
use regdiff_core::normalize::NormalizeOptions;
use regdiff_core::{log_op_end, log_op_error, log_op_start};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Outcome of comparing an item with a proposed change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalComparison {
    pub change_request_id: String,
    pub item_path: String,
    pub proposal: ProposalKind,
    pub tree: DiffTree,
}

/// Fetch and parse one object; `None` if the host has no data for it
async fn fetch<T: DeserializeOwned>(
    source: &dyn ObjectSource,
    path: &str,
    op: &str,
) -> Result<Option<T>, ExError> {
    let paths: BTreeSet<String> = std::iter::once(path.to_string()).collect();
    let mut data = source.get_object_data(&paths).await.map_err(|e| {
        ExError::new(ExErrorKind::FetchFailed)
            .with_op(op)
            .with_path(path)
            .with_message("object fetch failed")
            .with_source(e)
    })?;

    match data.remove(path).flatten() {
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op(op)
                .with_path(path)
                .with_message(e.to_string())
        }),
        None => Ok(None),
    }
}

fn not_found(op: &str, path: &str, what: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op)
        .with_path(path)
        .with_message(format!("{} not found", what))
}

async fn revision_payloads(
    source: &dyn ObjectSource,
    item_path: &str,
    rev_a: &str,
    rev_b: &str,
) -> Result<(Value, Value), ExError> {
    let op = "compare_revisions";
    let item: RegisterItem = fetch(source, item_path, op)
        .await?
        .ok_or_else(|| not_found(op, item_path, "register item"))?;
    item.validate().map_err(|e| ExError::from(e).with_op(op))?;

    let a = item.revision(rev_a).map_err(|e| ExError::from(e).with_op(op))?;
    let b = item.revision(rev_b).map_err(|e| ExError::from(e).with_op(op))?;
    Ok((a.payload.clone(), b.payload.clone()))
}

/// Left and right sides for a proposal comparison
struct ProposalSides {
    change_request_id: String,
    kind: ProposalKind,
    left: Option<Value>,
    right: Option<Value>,
}

async fn proposal_sides(
    source: &dyn ObjectSource,
    cr_path: &str,
    item_path: &str,
) -> Result<ProposalSides, ExError> {
    let op = "compare_proposal";
    let cr: ChangeRequest = fetch(source, cr_path, op)
        .await?
        .ok_or_else(|| not_found(op, cr_path, "change request"))?;
    let proposal = cr
        .proposal(item_path)
        .map_err(|e| ExError::from(e).with_op(op))?;

    let item: Option<RegisterItem> = fetch(source, item_path, op).await?;
    let current = match &item {
        Some(item) => Some(item.current().map_err(|e| ExError::from(e).with_op(op))?),
        None => None,
    };

    let (left, right) = match proposal {
        ChangeProposal::Addition { payload } => (None, Some(payload.clone())),
        ChangeProposal::Clarification { payload } => {
            let current = current.ok_or_else(|| not_found(op, item_path, "register item"))?;
            (Some(current.payload.clone()), Some(payload.clone()))
        }
        ChangeProposal::Amendment { amendment_type, .. } => {
            let current = current.ok_or_else(|| not_found(op, item_path, "register item"))?;
            (
                Some(json!({ "status": current.status.as_str() })),
                Some(json!({ "status": amendment_type.resulting_status().as_str() })),
            )
        }
    };

    Ok(ProposalSides {
        change_request_id: cr.id.clone(),
        kind: proposal.kind(),
        left,
        right,
    })
}

/// Diff two revisions of an item
///
/// # Errors
///
/// - `NotFound` if the item or either revision does not exist
/// - `InvalidRevisionTree` / `CycleDetected` if the item fails validation
/// - `FetchFailed` / `Serialization` if the item cannot be loaded
/// - `NormalizationFailed` if a payload is too deep
pub async fn compare_revisions(
    source: &dyn ObjectSource,
    item_path: &str,
    rev_a: &str,
    rev_b: &str,
    options: &NormalizeOptions,
) -> Result<DiffTree, ExError> {
    let start = Instant::now();
    log_op_start!("compare_revisions", item_path = item_path);

    let result = async {
        let (a, b) = revision_payloads(source, item_path, rev_a, rev_b).await?;
        compute_diff(Some(&a), Some(&b), options).map_err(ExError::from)
    }
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(tree) => {
            log_op_end!(
                "compare_revisions",
                duration_ms = duration_ms,
                changed_count = tree.summary.differences() as u64
            );
        }
        Err(err) => log_op_error!("compare_revisions", err.clone(), duration_ms = duration_ms),
    }
    result
}

/// Diff an item's current payload against what a proposal would make of it
///
/// Additions diff against an absent left side. Amendments only change the
/// item status, so only the status is compared.
///
/// # Errors
///
/// - `NotFound` if the change request is missing, does not touch
///   `item_path`, or the item is missing for a non-addition
/// - `FetchFailed` / `Serialization` if an object cannot be loaded
/// - `NormalizationFailed` if a payload is too deep
pub async fn compare_proposal(
    source: &dyn ObjectSource,
    cr_path: &str,
    item_path: &str,
    options: &NormalizeOptions,
) -> Result<ProposalComparison, ExError> {
    let start = Instant::now();
    log_op_start!("compare_proposal", item_path = item_path);

    let result = async {
        let sides = proposal_sides(source, cr_path, item_path).await?;
        let tree = compute_diff(sides.left.as_ref(), sides.right.as_ref(), options)
            .map_err(ExError::from)?;
        Ok::<_, ExError>(ProposalComparison {
            change_request_id: sides.change_request_id,
            item_path: item_path.to_string(),
            proposal: sides.kind,
            tree,
        })
    }
    .await;

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!("compare_proposal", duration_ms = duration_ms);
        }
        Err(err) => log_op_error!("compare_proposal", err.clone(), duration_ms = duration_ms),
    }
    result
}

/// Revision comparer for render loops
///
/// Re-rendering the same comparison reuses the previous tree as long as the
/// loaded payloads are unchanged.
pub struct Comparator {
    source: Arc<dyn ObjectSource>,
    memo: Mutex<DiffMemo>,
}

impl Comparator {
    pub fn new(source: Arc<dyn ObjectSource>, options: NormalizeOptions) -> Self {
        Self {
            source,
            memo: Mutex::new(DiffMemo::new(options)),
        }
    }

    /// As [`compare_revisions`], memoized
    ///
    /// # Errors
    ///
    /// As [`compare_revisions`].
    pub async fn revisions(
        &self,
        item_path: &str,
        rev_a: &str,
        rev_b: &str,
    ) -> Result<Arc<DiffTree>, ExError> {
        let (a, b) = revision_payloads(self.source.as_ref(), item_path, rev_a, rev_b).await?;
        let mut memo = self.memo.lock().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op("compare_revisions")
                .with_message("diff memo lock poisoned")
        })?;
        memo.diff(Some(&a), Some(&b)).map_err(ExError::from)
    }

    /// `(hits, misses)` of the underlying memo
    pub fn memo_stats(&self) -> (u64, u64) {
        self.memo
            .lock()
            .map(|m| (m.hits(), m.misses()))
            .unwrap_or_default()
    }
}
