//! Command orchestration layer.
//!
//! Command functions that load data through the host capability and run the
//! core algorithms over it.

pub mod compare;
