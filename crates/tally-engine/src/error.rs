//! # Ledger Errors
//!
//! The error type every public engine operation returns.
//!
//! ## Serialization
//! Callers that cross a process boundary send [`ErrorResponse`]:
//! ```json
//! {
//!   "code": "CONFLICT",
//!   "message": "Branch 1 already has an open shift: 010119102026X0042"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tally_core::{CoreError, FolioKind, ValidationError};
use tally_db::DbError;
use thiserror::Error;

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Close Step
// =============================================================================

/// The step of a shift close that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseStep {
    /// Reading the shift and its activity.
    Totals,
    /// Rounding totals and serializing the movement breakdown.
    Summary,
    /// Writing the shift and stamping documents in one transaction.
    Commit,
}

impl fmt::Display for CloseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseStep::Totals => write!(f, "totals"),
            CloseStep::Summary => write!(f, "summary"),
            CloseStep::Commit => write!(f, "commit"),
        }
    }
}

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors returned by the engine.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Caller input was rejected. Never retried.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The operation conflicts with current state (open shift exists,
    /// duplicate record).
    #[error("{0}")]
    Conflict(String),

    /// The shift was already closed.
    #[error("Shift {folio} is already closed")]
    ShiftAlreadyClosed { folio: String },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The store failed.
    #[error("Persistence failure: {0}")]
    Persistence(#[source] DbError),

    /// A domain record could not be processed.
    #[error("{0}")]
    Core(#[source] CoreError),

    /// Every candidate folio collided with an existing one.
    #[error("Could not issue a unique {kind} folio after {attempts} attempts")]
    FolioExhausted { kind: FolioKind, attempts: u32 },

    /// The four-digit sequence ran out for this prefix.
    #[error("{kind} sequence exhausted for prefix {prefix}")]
    SequenceOverflow { kind: FolioKind, prefix: String },

    /// A shift close failed. The shift is still open.
    #[error("Shift close failed at {step}: {source}")]
    CloseFailed {
        step: CloseStep,
        #[source]
        source: Box<LedgerError>,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Wraps an error with the close step it happened in.
    pub fn close_failed(step: CloseStep, source: LedgerError) -> Self {
        LedgerError::CloseFailed {
            step,
            source: Box::new(source),
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Validation(_) => ErrorCode::Validation,
            LedgerError::Conflict(_) | LedgerError::ShiftAlreadyClosed { .. } => {
                ErrorCode::Conflict
            }
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::Persistence(_) => ErrorCode::Persistence,
            LedgerError::Core(CoreError::InvalidTender { .. })
            | LedgerError::Core(CoreError::Validation(_)) => ErrorCode::Validation,
            LedgerError::Core(_) => ErrorCode::Internal,
            LedgerError::FolioExhausted { .. } => ErrorCode::FolioExhausted,
            LedgerError::SequenceOverflow { .. } => ErrorCode::SequenceOverflow,
            LedgerError::CloseFailed { .. } => ErrorCode::CloseFailed,
            LedgerError::Config(_) => ErrorCode::Config,
        }
    }

    /// The failing step, for close failures.
    pub fn close_step(&self) -> Option<CloseStep> {
        match self {
            LedgerError::CloseFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                LedgerError::Conflict(format!("Duplicate {}: '{}' already exists", field, value))
            }
            other => LedgerError::Persistence(other),
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => LedgerError::Validation(v),
            other => LedgerError::Core(other),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LedgerError {
    fn from(err: toml::ser::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

// =============================================================================
// Error Response
// =============================================================================

/// Error codes for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Validation,
    Conflict,
    NotFound,
    Persistence,
    FolioExhausted,
    SequenceOverflow,
    CloseFailed,
    Config,
    Internal,
}

/// Serializable `{ code, message }` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

impl From<&LedgerError> for ErrorResponse {
    fn from(err: &LedgerError) -> Self {
        if let LedgerError::Persistence(inner) = err {
            // Keep SQL details out of the message, log them instead
            tracing::error!(error = %inner, "Ledger persistence failure");
            return ErrorResponse {
                code: ErrorCode::Persistence,
                message: "Database operation failed".to_string(),
            };
        }
        ErrorResponse {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<LedgerError> for ErrorResponse {
    fn from(err: LedgerError) -> Self {
        ErrorResponse::from(&err)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = LedgerError::Conflict("busy".to_string());
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: LedgerError = DbError::not_found("Shift", "s1").into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: LedgerError = DbError::duplicate("folio", "x").into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: LedgerError = CoreError::invalid_tender("vales", "unknown").into();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    #[test]
    fn test_close_failed_names_step() {
        let inner = LedgerError::Persistence(DbError::TransactionFailed("disk".to_string()));
        let err = LedgerError::close_failed(CloseStep::Commit, inner);
        assert_eq!(err.code(), ErrorCode::CloseFailed);
        assert_eq!(err.close_step(), Some(CloseStep::Commit));
        assert!(err.to_string().contains("commit"));
    }

    #[test]
    fn test_error_response_json() {
        let err = LedgerError::ShiftAlreadyClosed {
            folio: "010119102026X0001".to_string(),
        };
        let json = serde_json::to_string(&ErrorResponse::from(&err)).unwrap();
        assert_eq!(
            json,
            r#"{"code":"CONFLICT","message":"Shift 010119102026X0001 is already closed"}"#
        );

        let hidden = ErrorResponse::from(LedgerError::Persistence(DbError::QueryFailed(
            "no such table".to_string(),
        )));
        assert_eq!(hidden.message, "Database operation failed");
    }
}
