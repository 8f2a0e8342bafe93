//! RegDiff Engine - Orchestration layer
//!
//! Coordinates the pure diff kernel with an injected host capability
//! (`ObjectSource`): change history resolution over filtered indices and
//! revision/proposal comparison.

pub mod commands;
pub mod history;
pub mod memory;
pub mod source;

pub use commands::compare::{compare_proposal, compare_revisions, Comparator, ProposalComparison};
pub use history::{ChangeHistory, HistoryEntry, HistoryPage, HistoryResolver};
pub use memory::{BuildMode, MemoryObjectSource};
pub use source::{BuildState, IndexHandle, IndexStatus, ObjectSource, Predicate};
