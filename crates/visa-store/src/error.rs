//! Store error types

use crate::table::Table;
use visa_model::RecordId;

/// The underlying store call itself failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable
    #[error("connection failed: {0}")]
    Connection(String),

    /// Caller lacks the capability for this call
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed or rejected query
    #[error("query failed: {0}")]
    Query(String),

    /// Table missing or not readable
    #[error("table {0} is not accessible")]
    TableUnavailable(Table),

    /// Update targeted a row that does not exist
    #[error("row {0} not found")]
    RowNotFound(RecordId),

    /// Store does not implement this operation
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    /// Transient failures a caller may choose to re-invoke
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
