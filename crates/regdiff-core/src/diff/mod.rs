//! Structural payload diff.
//!
//! Compares two semi-structured payloads and produces a classified tree that
//! mirrors both inputs.
//!
//! ## Entry point
//!
//! ```
//! use regdiff_core::diff::{compute_diff, render_human_summary};
//! use regdiff_core::normalize::NormalizeOptions;
//! use serde_json::json;
//!
//! let a = json!({"a": 1, "b": {"c": 2}});
//! let b = json!({"a": 1, "b": {"c": 3, "d": 4}});
//! let tree = compute_diff(Some(&a), Some(&b), &NormalizeOptions::default()).unwrap();
//! let summary = render_human_summary(&tree, false);
//! assert!(summary.contains("b.d"));
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: mapping keys are compared in sorted order, so equal
//!   inputs always produce identical trees regardless of key insertion order.
//! - **Full structure**: unchanged subtrees stay in the tree; filtering them
//!   is done by [`view`].
//! - **Positional sequences**: items are matched by index only.

pub mod engine;
pub mod human_summary;
pub mod memo;
pub mod model;
pub mod view;

pub use engine::{compute_diff, diff};
pub use human_summary::render_human_summary;
pub use memo::{same_shape, should_recompute, DiffMemo, ShapeFingerprint};
pub use model::{DiffNode, DiffStatus, DiffSummary, DiffTree};
pub use view::{entries, DiffEntry};
