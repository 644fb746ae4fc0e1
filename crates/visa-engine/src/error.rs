//! Error types for the consistency engine
//!
//! Every repository and orchestrator call returns one of these. Nothing here
//! is retried automatically; classification only tells the caller what is
//! safe to re-invoke.

use serde::{Deserialize, Serialize};
use visa_model::{CountryId, ValidationError};
use visa_store::StoreError;

/// Main engine error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Underlying store call failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Caller input rejected before touching the store
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Country unknown to the country-management subsystem
    #[error("country {0} not found")]
    NotFound(CountryId),

    /// Step N succeeded, step N+1 failed; no rollback was attempted
    #[error("partial failure: {}", .failures.join("; "))]
    PartialFailure {
        /// Steps that were persisted
        completed: Vec<String>,
        /// Failure messages of the steps that were not
        failures: Vec<String>,
    },

    /// Schema reconciler refused; nothing was mutated afterwards
    #[error("schema check failed: {message}. Run the database repair tool ({hint}) before retrying")]
    SchemaGate {
        /// Reconciler message, verbatim
        message: String,
        /// Where the operator should go next
        hint: String,
    },
}

impl EngineError {
    /// Coarse classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) => ErrorKind::Store,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PartialFailure { .. } => ErrorKind::PartialFailure,
            Self::SchemaGate { .. } => ErrorKind::SchemaGate,
        }
    }

    /// Whether re-invoking the same call could succeed without changes
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::PartialFailure { .. } => true,
            _ => false,
        }
    }

    /// Build a partial failure from one persisted step and one failed step
    #[inline]
    pub fn partial(completed: impl Into<String>, failure: impl std::fmt::Display) -> Self {
        Self::PartialFailure {
            completed: vec![completed.into()],
            failures: vec![failure.to_string()],
        }
    }
}

/// Error classification, mirrored into operation outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Store,
    Validation,
    NotFound,
    PartialFailure,
    SchemaGate,
}

/// Result alias used throughout the engine
pub type EngineResult<T> = Result<T, EngineError>;
