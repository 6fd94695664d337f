//! Centralized error handling for the loan ledger engine.
//!
//! Every operation in the engine returns [`LedgerError`], a closed taxonomy
//! with stable machine-readable codes. Nothing is retried internally; callers
//! decide between surfacing the failure and re-read-and-retry.

use thiserror::Error;
use uuid::Uuid;

/// Engine error type with stable code mapping
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Loan approval blocked by unresolved ceiling override {override_id}")]
    PrecheckFailed { override_id: Uuid },

    #[error("No installment scheduled: {0}")]
    NotScheduled(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Store failure: {0}")]
    Store(String),
}

impl LedgerError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "VALIDATION_ERROR",
            LedgerError::Authorization(_) => "AUTHORIZATION_ERROR",
            LedgerError::Conflict(_) => "CONFLICT_ERROR",
            LedgerError::PrecheckFailed { .. } => "PRECHECK_FAILED",
            LedgerError::NotScheduled(_) => "NOT_SCHEDULED",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether a caller may re-read the record and retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_) | LedgerError::Store(_))
    }
}

// Convenience conversions from common error types

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Store(format!("document serialization failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(err: validator::ValidationErrors) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

/// Result type alias using LedgerError
pub type LedgerResult<T> = Result<T, LedgerError>;
