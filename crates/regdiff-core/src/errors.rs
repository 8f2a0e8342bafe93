use regdiff_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using RegDiffError
pub type Result<T> = std::result::Result<T, RegDiffError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// test assertions and log fields (`err.code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    NotFound,
    CycleDetected,
    InvalidRevisionTree,
    DuplicateProposal,

    // Normalization
    /// Payload cannot be represented as a normalized value (too deep to be acyclic data)
    NormalizationFailed,

    // Host capabilities
    /// The host could not create or query a filtered index
    IndexUnavailable,
    /// The host failed to return object data
    FetchFailed,

    // Configuration / IO
    InvalidConfig,
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::InvalidRevisionTree => "ERR_INVALID_REVISION_TREE",
            ExErrorKind::DuplicateProposal => "ERR_DUPLICATE_PROPOSAL",
            ExErrorKind::NormalizationFailed => "ERR_NORMALIZATION_FAILED",
            ExErrorKind::IndexUnavailable => "ERR_INDEX_UNAVAILABLE",
            ExErrorKind::FetchFailed => "ERR_FETCH_FAILED",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) plus optional context for debugging.
/// Built with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    path: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            path: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (item id, revision id, change request id)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add object path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for the model, normalizer and configuration layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegDiffError {
    // ===== Revision tree =====
    /// Item has no revisions at all
    #[error("Register item {item_id} has no revisions")]
    EmptyRevisionTree { item_id: String },

    /// Current revision pointer is dangling
    #[error("Register item {item_id}: current revision {revision_id} does not exist")]
    CurrentRevisionMissing {
        item_id: String,
        revision_id: String,
    },

    /// A revision names a parent that is not in the tree
    #[error("Revision {revision_id} of item {item_id} references unknown parent {parent_id}")]
    UnknownParentRevision {
        item_id: String,
        revision_id: String,
        parent_id: String,
    },

    /// Parent links loop back on themselves
    #[error("Cycle detected in revision tree of item {item_id} at revision {revision_id}")]
    RevisionCycle {
        item_id: String,
        revision_id: String,
    },

    /// Requested revision is not in the tree
    #[error("Revision {revision_id} not found in item {item_id}")]
    RevisionNotFound {
        item_id: String,
        revision_id: String,
    },

    // ===== Change requests =====
    /// Two proposals target the same item path
    #[error("Change request {cr_id} has more than one proposal for {item_path}")]
    DuplicateProposal { cr_id: String, item_path: String },

    /// Change request does not touch the item
    #[error("Change request {cr_id} has no proposal for {item_path}")]
    ProposalNotFound { cr_id: String, item_path: String },

    // ===== Normalization =====
    /// Payload nesting exceeded the configured depth
    #[error("Payload nesting exceeds maximum depth {max_depth} at {path}")]
    DepthExceeded { max_depth: usize, path: String },

    // ===== Configuration =====
    /// Configuration value is out of range or unparseable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON/YAML/TOML encoding or decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Filesystem error
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Conversion from RegDiffError to ExError
impl From<RegDiffError> for ExError {
    fn from(err: RegDiffError) -> Self {
        let message = err.to_string();
        match err {
            RegDiffError::EmptyRevisionTree { item_id } => {
                ExError::new(ExErrorKind::InvalidRevisionTree)
                    .with_entity_id(item_id)
                    .with_message(message)
            }
            RegDiffError::CurrentRevisionMissing { item_id, .. }
            | RegDiffError::UnknownParentRevision { item_id, .. } => {
                ExError::new(ExErrorKind::InvalidRevisionTree)
                    .with_entity_id(item_id)
                    .with_message(message)
            }
            RegDiffError::RevisionCycle { item_id, .. } => {
                ExError::new(ExErrorKind::CycleDetected)
                    .with_entity_id(item_id)
                    .with_message(message)
            }
            RegDiffError::RevisionNotFound { revision_id, .. } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(revision_id)
                    .with_message(message)
            }
            RegDiffError::DuplicateProposal { cr_id, item_path } => {
                ExError::new(ExErrorKind::DuplicateProposal)
                    .with_entity_id(cr_id)
                    .with_path(item_path)
                    .with_message(message)
            }
            RegDiffError::ProposalNotFound { cr_id, item_path } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(cr_id)
                    .with_path(item_path)
                    .with_message(message)
            }
            RegDiffError::DepthExceeded { path, .. } => {
                ExError::new(ExErrorKind::NormalizationFailed)
                    .with_op("normalize")
                    .with_path(path)
                    .with_message(message)
            }
            RegDiffError::InvalidConfig { .. } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }
            RegDiffError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            RegDiffError::Io { .. } => ExError::new(ExErrorKind::Io).with_message(message),
        }
    }
}

impl From<serde_json::Error> for RegDiffError {
    fn from(err: serde_json::Error) -> Self {
        RegDiffError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RegDiffError {
    fn from(err: toml::de::Error) -> Self {
        RegDiffError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for RegDiffError {
    fn from(err: std::io::Error) -> Self {
        RegDiffError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::InvalidRevisionTree, "ERR_INVALID_REVISION_TREE"),
            (ExErrorKind::CycleDetected, "ERR_CYCLE_DETECTED"),
            (ExErrorKind::NormalizationFailed, "ERR_NORMALIZATION_FAILED"),
            (ExErrorKind::IndexUnavailable, "ERR_INDEX_UNAVAILABLE"),
            (ExErrorKind::FetchFailed, "ERR_FETCH_FAILED"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_revision_cycle_maps_to_cycle_detected() {
        let err: ExError = RegDiffError::RevisionCycle {
            item_id: "item-1".into(),
            revision_id: "r2".into(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::CycleDetected);
        assert_eq!(err.entity_id(), Some("item-1"));
        assert!(err.message().contains("r2"));
    }

    #[test]
    fn test_depth_exceeded_carries_path() {
        let err: ExError = RegDiffError::DepthExceeded {
            max_depth: 4,
            path: "a.b.c.d".into(),
        }
        .into();
        assert_eq!(err.code(), "ERR_NORMALIZATION_FAILED");
        assert_eq!(err.path(), Some("a.b.c.d"));
        assert_eq!(err.op(), Some("normalize"));
    }

    #[test]
    fn test_display_includes_code_op_and_path() {
        let err = ExError::new(ExErrorKind::FetchFailed)
            .with_op("fetch_object")
            .with_path("/proposals/cr-1/main.yaml")
            .with_message("host unavailable");
        let shown = err.to_string();
        assert!(shown.starts_with("[ERR_FETCH_FAILED]"));
        assert!(shown.contains("fetch_object"));
        assert!(shown.contains("/proposals/cr-1/main.yaml"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        use std::error::Error as _;
        let inner = ExError::new(ExErrorKind::Io).with_message("disk");
        let outer = ExError::new(ExErrorKind::FetchFailed).with_source(inner);
        assert_eq!(outer.source_error().map(|e| e.kind()), Some(ExErrorKind::Io));
        assert!(outer.source().is_some());
    }
}
