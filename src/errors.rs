//! Engine error taxonomy.
//!
//! Every engine operation returns a typed [`EngineError`]; the transport
//! layer maps error kinds to response codes (`Unauthorized` -> 401,
//! `Forbidden` -> 403, `NotFound` -> 404, `InvalidInput`/`InvalidState`/
//! `CapacityExceeded` -> 400, anything else -> 500).

use thiserror::Error;

use crate::tournament::TournamentStatus;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed or missing request data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation is not valid for the current lifecycle state
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: TournamentStatus,
    },

    /// No or invalid credential
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Authenticated but lacks the required relationship
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Registration would breach a hard limit
    #[error("Tournament is full: {max} participants")]
    CapacityExceeded { max: u32 },

    /// Idempotency violation, e.g. a duplicate live privilege
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and serialization errors are sanitized to prevent
    /// information disclosure about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            EngineError::Database(_) | EngineError::Serialization(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the caller may safely retry the failed operation
    ///
    /// Conditional-write failures (`InvalidState`, `CapacityExceeded`) are
    /// definitive: the precondition will remain false on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Database(_) | EngineError::Conflict(_))
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
