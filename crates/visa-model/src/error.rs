//! Input validation errors
//!
//! Raised before any store call is attempted.

/// Caller supplied invalid input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Country id missing or blank
    #[error("country id is required")]
    MissingCountryId,

    /// Replacement set for documents is empty
    #[error("at least one document is required")]
    EmptyDocumentSet,

    /// Document name empty after trimming
    #[error("document {index} has an empty name")]
    BlankDocumentName { index: usize },

    /// Document description empty after trimming
    #[error("document {index} has an empty description")]
    BlankDocumentDescription { index: usize },
}
