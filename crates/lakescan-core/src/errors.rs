use crate::model::SnapshotId;
use thiserror::Error;

/// Result type alias using ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on without
/// parsing messages. `NOT_READY` is deliberately absent: it is a plan value,
/// not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Request validation
    InvalidInput,
    InvalidOption,

    // Snapshot history
    SnapshotNotFound,
    SnapshotExpired,

    // Collaborators
    CatalogQuery,

    // Lifecycle
    Cancelled,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidOption => "ERR_INVALID_OPTION",
            ExErrorKind::SnapshotNotFound => "ERR_SNAPSHOT_NOT_FOUND",
            ExErrorKind::SnapshotExpired => "ERR_SNAPSHOT_EXPIRED",
            ExErrorKind::CatalogQuery => "ERR_CATALOG_QUERY",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Only collaborator failures qualify; expired or missing snapshots need
    /// a new starting point.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExErrorKind::CatalogQuery)
    }
}

/// Canonical structured error type
///
/// Surfaced by the engine layer. Carries classification plus the snapshot
/// context a caller needs to decide where to restart.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    snapshot_id: Option<SnapshotId>,
    earliest_snapshot_id: Option<SnapshotId>,
    option_key: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            snapshot_id: None,
            earliest_snapshot_id: None,
            option_key: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the requested snapshot id
    pub fn with_snapshot_id(mut self, id: SnapshotId) -> Self {
        self.snapshot_id = Some(id);
        self
    }

    /// Add the earliest snapshot id still available in the store
    pub fn with_earliest_snapshot_id(mut self, id: SnapshotId) -> Self {
        self.earliest_snapshot_id = Some(id);
        self
    }

    /// Add the offending option key
    pub fn with_option_key(mut self, key: impl Into<String>) -> Self {
        self.option_key = Some(key.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
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

    pub fn snapshot_id(&self) -> Option<SnapshotId> {
        self.snapshot_id
    }

    pub fn earliest_snapshot_id(&self) -> Option<SnapshotId> {
        self.earliest_snapshot_id
    }

    pub fn option_key(&self) -> Option<&str> {
        self.option_key.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
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
        if let Some(id) = self.snapshot_id {
            write!(f, " (snapshot_id: {})", id)?;
        }
        if let Some(id) = self.earliest_snapshot_id {
            write!(f, " (earliest_snapshot_id: {})", id)?;
        }
        if let Some(key) = &self.option_key {
            write!(f, " (option: {})", key)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for scan planning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Requested snapshot id was never committed
    #[error("Snapshot not found: {snapshot_id}")]
    SnapshotNotFound { snapshot_id: SnapshotId },

    /// Requested snapshot existed but has been removed by retention
    #[error("Snapshot {requested} has expired (earliest available: {earliest:?})")]
    SnapshotExpired {
        requested: SnapshotId,
        earliest: Option<SnapshotId>,
    },

    /// Underlying listing or storage failure, propagated verbatim
    #[error("Catalog query failed: {message}")]
    CatalogQuery { message: String },

    /// Request is malformed (e.g. inverted incremental range)
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A scan option is missing or cannot be parsed
    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// The continuous scan was cancelled by its owner
    #[error("Scan was cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScanError {
    /// Build an `InvalidOption` error
    pub fn invalid_option(key: &str, reason: impl Into<String>) -> Self {
        ScanError::InvalidOption {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Build an `InvalidInput` error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        ScanError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Conversion from ScanError to ExError
impl From<ScanError> for ExError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::SnapshotNotFound { snapshot_id } => {
                ExError::new(ExErrorKind::SnapshotNotFound)
                    .with_snapshot_id(snapshot_id)
                    .with_message("Snapshot was never committed")
            }

            ScanError::SnapshotExpired {
                requested,
                earliest,
            } => {
                let ex = ExError::new(ExErrorKind::SnapshotExpired)
                    .with_snapshot_id(requested)
                    .with_message("Snapshot has been expired and cannot be read");
                match earliest {
                    Some(earliest) => ex.with_earliest_snapshot_id(earliest),
                    None => ex,
                }
            }

            ScanError::CatalogQuery { message } => {
                ExError::new(ExErrorKind::CatalogQuery).with_message(message)
            }

            ScanError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            ScanError::InvalidOption { key, reason } => ExError::new(ExErrorKind::InvalidOption)
                .with_option_key(key)
                .with_message(reason),

            ScanError::Cancelled => {
                ExError::new(ExErrorKind::Cancelled).with_message("Scan was cancelled")
            }

            ScanError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to ScanError
impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Internal {
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
            (ExErrorKind::SnapshotNotFound, "ERR_SNAPSHOT_NOT_FOUND"),
            (ExErrorKind::SnapshotExpired, "ERR_SNAPSHOT_EXPIRED"),
            (ExErrorKind::CatalogQuery, "ERR_CATALOG_QUERY"),
            (ExErrorKind::InvalidOption, "ERR_INVALID_OPTION"),
            (ExErrorKind::Cancelled, "ERR_CANCELLED"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_only_catalog_errors_are_retryable() {
        assert!(ExErrorKind::CatalogQuery.is_retryable());
        assert!(!ExErrorKind::SnapshotExpired.is_retryable());
        assert!(!ExErrorKind::SnapshotNotFound.is_retryable());
    }

    #[test]
    fn test_expired_carries_restart_context() {
        let ex: ExError = ScanError::SnapshotExpired {
            requested: 3,
            earliest: Some(5),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::SnapshotExpired);
        assert_eq!(ex.snapshot_id(), Some(3));
        assert_eq!(ex.earliest_snapshot_id(), Some(5));
    }

    #[test]
    fn test_display_includes_op_and_snapshot() {
        let ex = ExError::from(ScanError::SnapshotNotFound { snapshot_id: 9 }).with_op("plan_batch");
        let rendered = ex.to_string();
        assert!(rendered.contains("ERR_SNAPSHOT_NOT_FOUND"));
        assert!(rendered.contains("plan_batch"));
        assert!(rendered.contains("snapshot_id: 9"));
    }
}
