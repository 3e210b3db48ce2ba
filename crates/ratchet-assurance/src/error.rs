//! Error types for assurance operations

use ratchet_domain::{ReviewError, TransitionError};
use ratchet_graph::GraphError;
use ratchet_ledger::LedgerError;
use ratchet_store::StoreError;
use thiserror::Error;

/// How serious an error is for operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Caller mistake, nothing to investigate
    Low,
    /// Refused operation or lost race
    Medium,
    /// Stored data failed an integrity check
    High,
}

/// Errors that can occur during assurance operations
#[derive(Error, Debug)]
pub enum AssuranceError {
    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The claim is not in a state that allows the operation
    #[error("Prerequisite not met: {0}")]
    Prerequisite(String),

    /// The operation lost a race or repeats a completed one
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Content or ledger data failed verification
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Referenced entity or project does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The actor may not perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl AssuranceError {
    /// Operator-facing severity
    pub fn severity(&self) -> Severity {
        match self {
            AssuranceError::Validation(_) | AssuranceError::NotFound(_) => Severity::Low,
            AssuranceError::Prerequisite(_)
            | AssuranceError::Conflict(_)
            | AssuranceError::Unauthorized(_) => Severity::Medium,
            AssuranceError::Integrity(_) | AssuranceError::Store(_) => Severity::High,
        }
    }
}

impl From<StoreError> for AssuranceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(msg) => AssuranceError::Conflict(msg),
            StoreError::Duplicate(msg) => AssuranceError::Conflict(msg),
            StoreError::NotFound(msg) => AssuranceError::NotFound(msg),
            StoreError::Ledger(e) => e.into(),
            other => AssuranceError::Store(other),
        }
    }
}

impl From<LedgerError> for AssuranceError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::InvalidRange { .. } => AssuranceError::Validation(error.to_string()),
            LedgerError::Serialization(_) => AssuranceError::Store(StoreError::Ledger(error)),
            other => AssuranceError::Integrity(other.to_string()),
        }
    }
}

impl From<GraphError> for AssuranceError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::Store(e) => e.into(),
        }
    }
}

impl From<TransitionError> for AssuranceError {
    fn from(error: TransitionError) -> Self {
        AssuranceError::Prerequisite(error.to_string())
    }
}

impl From<ReviewError> for AssuranceError {
    fn from(error: ReviewError) -> Self {
        match error {
            ReviewError::AlreadyFinalized(_) => AssuranceError::Conflict(error.to_string()),
            ReviewError::PendingDecision => AssuranceError::Validation(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AssuranceError {
    fn from(error: serde_json::Error) -> Self {
        AssuranceError::Store(StoreError::Serialization(error))
    }
}

/// Result type for assurance operations
pub type Result<T> = std::result::Result<T, AssuranceError>;
