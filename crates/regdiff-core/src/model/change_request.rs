//! Change request domain model
//!
//! A change request (CR) bundles proposals, at most one per item path, and
//! carries review workflow metadata. The core only reads CRs; creating and
//! accepting them belongs to the curation workflow.

use crate::errors::{RegDiffError, Result};
use crate::model::item::ItemStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Length of the justification excerpt carried in summaries
pub const JUSTIFICATION_EXCERPT_CHARS: usize = 140;

/// Review outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    Accepted,
    NotAccepted,
    Withdrawn,
    #[default]
    Undetermined,
}

impl Disposition {
    /// Whether a CR with this disposition belongs in an item's change history
    pub fn is_history_visible(&self) -> bool {
        !matches!(self, Disposition::NotAccepted | Disposition::Withdrawn)
    }
}

/// Workflow state of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrState {
    #[default]
    Draft,
    Proposed,
    SubmittedForReview,
    ReturnedForClarification,
    Accepted,
    NotAccepted,
    Withdrawn,
    Appealed,
}

/// Sub-kind of an amendment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmendmentType {
    Supersession,
    Retirement,
    Invalidation,
}

impl AmendmentType {
    /// Item status an accepted amendment of this type leads to
    pub fn resulting_status(&self) -> ItemStatus {
        match self {
            AmendmentType::Supersession => ItemStatus::Superseded,
            AmendmentType::Retirement => ItemStatus::Retired,
            AmendmentType::Invalidation => ItemStatus::Invalid,
        }
    }
}

/// One edit to one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeProposal {
    /// New item with the given payload
    Addition { payload: Value },

    /// Non-substantive edit of an existing item's payload
    Clarification { payload: Value },

    /// Status change of an existing item
    #[serde(rename_all = "camelCase")]
    Amendment {
        amendment_type: AmendmentType,
        /// Items that replace this one (supersession only)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        superseding_items: Vec<String>,
    },
}

/// Proposal kind without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "amendmentType", rename_all = "camelCase")]
pub enum ProposalKind {
    Addition,
    Clarification,
    Amendment(AmendmentType),
}

impl ChangeProposal {
    pub fn kind(&self) -> ProposalKind {
        match self {
            ChangeProposal::Addition { .. } => ProposalKind::Addition,
            ChangeProposal::Clarification { .. } => ProposalKind::Clarification,
            ChangeProposal::Amendment { amendment_type, .. } => {
                ProposalKind::Amendment(*amendment_type)
            }
        }
    }

    /// Payload carried by the proposal, if it carries one
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ChangeProposal::Addition { payload } | ChangeProposal::Clarification { payload } => {
                Some(payload)
            }
            ChangeProposal::Amendment { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: String,

    #[serde(default)]
    pub justification: String,

    #[serde(default)]
    pub state: CrState,

    #[serde(default)]
    pub disposition: Disposition,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_proposed: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_started: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_disposed: Option<DateTime<Utc>>,

    /// Item path -> proposal
    #[serde(default)]
    pub items: BTreeMap<String, ChangeProposal>,
}

/// What the history list shows for one change request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestSummary {
    pub id: String,
    pub object_path: String,
    pub justification_excerpt: String,
    pub state: CrState,
    pub disposition: Disposition,
    pub time_proposed: Option<DateTime<Utc>>,
    pub time_disposed: Option<DateTime<Utc>>,
    pub proposal_count: usize,
    /// Kind of the proposal for the item the history was queried for
    pub proposal: Option<ProposalKind>,
}

impl ChangeRequest {
    pub fn new(id: impl Into<String>, justification: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            justification: justification.into(),
            state: CrState::Draft,
            disposition: Disposition::Undetermined,
            time_proposed: None,
            time_started: None,
            time_disposed: None,
            items: BTreeMap::new(),
        }
    }

    /// Build a CR from a list of proposals
    ///
    /// # Errors
    ///
    /// `DuplicateProposal` if two proposals target the same item path.
    pub fn from_proposals(
        id: impl Into<String>,
        justification: impl Into<String>,
        proposals: Vec<(String, ChangeProposal)>,
    ) -> Result<Self> {
        let mut cr = Self::new(id, justification);
        for (path, proposal) in proposals {
            cr.add_proposal(path, proposal)?;
        }
        Ok(cr)
    }

    /// # Errors
    ///
    /// `DuplicateProposal` if the path already has a proposal.
    pub fn add_proposal(&mut self, item_path: String, proposal: ChangeProposal) -> Result<()> {
        if self.items.contains_key(&item_path) {
            return Err(RegDiffError::DuplicateProposal {
                cr_id: self.id.clone(),
                item_path,
            });
        }
        self.items.insert(item_path, proposal);
        Ok(())
    }

    pub fn touches(&self, item_path: &str) -> bool {
        self.items.contains_key(item_path)
    }

    pub fn is_history_visible(&self) -> bool {
        self.disposition.is_history_visible()
    }

    /// # Errors
    ///
    /// `ProposalNotFound` if the CR does not touch `item_path`.
    pub fn proposal(&self, item_path: &str) -> Result<&ChangeProposal> {
        self.items
            .get(item_path)
            .ok_or_else(|| RegDiffError::ProposalNotFound {
                cr_id: self.id.clone(),
                item_path: item_path.to_string(),
            })
    }

    /// Summary for display in the history of `item_path`
    pub fn summary(&self, object_path: &str, item_path: &str) -> ChangeRequestSummary {
        ChangeRequestSummary {
            id: self.id.clone(),
            object_path: object_path.to_string(),
            justification_excerpt: excerpt(&self.justification, JUSTIFICATION_EXCERPT_CHARS),
            state: self.state,
            disposition: self.disposition,
            time_proposed: self.time_proposed,
            time_disposed: self.time_disposed,
            proposal_count: self.items.len(),
            proposal: self.items.get(item_path).map(ChangeProposal::kind),
        }
    }
}

/// First `max_chars` characters, with an ellipsis when cut
fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disposition_visibility() {
        assert!(Disposition::Accepted.is_history_visible());
        assert!(Disposition::Undetermined.is_history_visible());
        assert!(!Disposition::NotAccepted.is_history_visible());
        assert!(!Disposition::Withdrawn.is_history_visible());
    }

    #[test]
    fn test_duplicate_proposal_is_rejected() {
        let err = ChangeRequest::from_proposals(
            "cr-1",
            "fix",
            vec![
                (
                    "/units/a.yaml".to_string(),
                    ChangeProposal::Clarification {
                        payload: json!({"name": "x"}),
                    },
                ),
                (
                    "/units/a.yaml".to_string(),
                    ChangeProposal::Amendment {
                        amendment_type: AmendmentType::Retirement,
                        superseding_items: vec![],
                    },
                ),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RegDiffError::DuplicateProposal { .. }));
    }

    #[test]
    fn test_deserializes_host_document() {
        let cr: ChangeRequest = serde_json::from_value(json!({
            "id": "cr-42",
            "justification": "Correct the symbol",
            "state": "submittedForReview",
            "disposition": "notAccepted",
            "timeProposed": "2026-03-01T09:00:00Z",
            "items": {
                "/units/m.yaml": {"type": "clarification", "payload": {"symbol": "m"}},
                "/units/old.yaml": {
                    "type": "amendment",
                    "amendmentType": "supersession",
                    "supersedingItems": ["/units/m.yaml"]
                }
            }
        }))
        .unwrap();

        assert_eq!(cr.state, CrState::SubmittedForReview);
        assert_eq!(cr.disposition, Disposition::NotAccepted);
        assert!(cr.touches("/units/m.yaml"));
        assert_eq!(
            cr.proposal("/units/old.yaml").unwrap().kind(),
            ProposalKind::Amendment(AmendmentType::Supersession)
        );
    }

    #[test]
    fn test_missing_disposition_defaults_to_undetermined() {
        let cr: ChangeRequest = serde_json::from_value(json!({"id": "cr-1"})).unwrap();
        assert_eq!(cr.disposition, Disposition::Undetermined);
        assert!(cr.items.is_empty());
    }

    #[test]
    fn test_summary_excerpt_is_truncated() {
        let mut cr = ChangeRequest::new("cr-9", "x".repeat(300));
        cr.add_proposal(
            "/units/a.yaml".to_string(),
            ChangeProposal::Addition {
                payload: json!({}),
            },
        )
        .unwrap();
        let summary = cr.summary("/proposals/cr-9/main.yaml", "/units/a.yaml");
        assert_eq!(
            summary.justification_excerpt.chars().count(),
            JUSTIFICATION_EXCERPT_CHARS + 1
        );
        assert!(summary.justification_excerpt.ends_with('…'));
        assert_eq!(summary.proposal, Some(ProposalKind::Addition));
        assert_eq!(summary.proposal_count, 1);
    }

    #[test]
    fn test_amendment_resulting_status() {
        assert_eq!(
            AmendmentType::Retirement.resulting_status(),
            ItemStatus::Retired
        );
    }
}
