//! Canonical schema constants for structured logging
//!
//! Every log line emitted through the `log_op_*` macros uses these keys, so
//! log consumers can rely on a single vocabulary across crates.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Entity identifiers
pub const FIELD_ITEM_PATH: &str = "item_path";
pub const FIELD_OBJECT_PATH: &str = "object_path";
pub const FIELD_REVISION_ID: &str = "revision_id";
pub const FIELD_INDEX_ID: &str = "index_id";

// Collection sizes and positions
pub const FIELD_MATCH_COUNT: &str = "match_count";
pub const FIELD_POSITION: &str = "position";
pub const FIELD_CHANGED_COUNT: &str = "changed_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
