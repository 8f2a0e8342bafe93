//! RegDiff Core - registry payload diff kernel
//!
//! This crate provides the pure, I/O-free part of the registry review tools:
//! - Register item, revision and change request models with validation
//! - Payload normalization into a canonical tree
//! - Structural diffing with a display filter and Markdown summary
//! - Shape-equality memoization for repeated comparisons
//! - The shared error, logging and configuration facilities

pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod normalize;
pub mod path;

// Re-export commonly used types
pub use config::RegDiffConfig;
pub use diff::{compute_diff, DiffMemo, DiffNode, DiffStatus, DiffTree};
pub use errors::{ExError, ExErrorKind, RegDiffError, Result};
pub use model::{ChangeProposal, ChangeRequest, ChangeRequestSummary, Disposition, RegisterItem};
pub use normalize::{normalize, NormalizeOptions, NormalizedValue};
pub use path::ValuePath;
