//! # Error Types
//!
//! Typed errors for the reconciliation engine. Every failure is surfaced to
//! the immediate caller; the engine performs no retries and no silent
//! suppression beyond the documented no-op cases (a bulk import with zero new
//! keys, an auto-reconcile with zero duplicate groups).

use thiserror::Error;

use crate::store::StoreError;

/// Validation errors raised synchronously on write paths.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("natural key field '{field}' is missing")]
    MissingNaturalKey { field: String },

    #[error("natural key field '{field}' is empty after trimming")]
    EmptyNaturalKey { field: String },

    #[error("natural key field '{field}' must be a text value")]
    NaturalKeyNotText { field: String },
}

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("duplicate natural key '{key}' in collection '{kind}'")]
    DuplicateKey { kind: String, key: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("bulk import partially failed: {succeeded} succeeded, {failed} failed")]
    BatchPartialFailure { succeeded: usize, failed: usize },

    #[error("no policy registered for entity kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("record '{id}' not found in collection '{kind}'")]
    RecordNotFound { kind: String, id: String },
}

impl EngineError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a duplicate-key rejection.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns true if this is a partial batch failure.
    #[must_use]
    pub const fn is_partial_failure(&self) -> bool {
        matches!(self, Self::BatchPartialFailure { .. })
    }

    /// Returns true if retrying the operation could succeed.
    ///
    /// The engine never retries on its own; this hint is for callers that
    /// wrap it in a retry/backoff layer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(store) => store.is_transient(),
            Self::Validation(_)
            | Self::DuplicateKey { .. }
            | Self::BatchPartialFailure { .. }
            | Self::UnknownKind { .. }
            | Self::RecordNotFound { .. } => false,
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
