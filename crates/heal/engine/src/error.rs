//! Error types for heal-engine crate.
//!
//! Only infrastructure failures are errors here. A failed action, a failed
//! verification or a missing runbook is a normal outcome recorded on the
//! incident, never an `Err`.

use heal_types::TransitionError;
use thiserror::Error;

/// Errors raised by an incident store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Record already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data could not be encoded or decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Backend unreachable.
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend rejected a query.
    #[error("query error: {0}")]
    Query(String),
}

/// Errors that can occur while orchestrating recovery.
#[derive(Debug, Error)]
pub enum HealError {
    /// Incident store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Illegal incident status change.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Invalid runbook or engine configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for engine operations.
pub type HealResult<T> = Result<T, HealError>;
