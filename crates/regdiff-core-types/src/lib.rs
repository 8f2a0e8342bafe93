//! Core types shared by the regdiff error and logging facilities
//!
//! - **Correlation types**: RequestId, TraceId, SpanId, RequestContext
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, SpanId, TraceId};
