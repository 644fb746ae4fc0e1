//! Visa Model - typed records for per-country visa configuration
//!
//! Every country carries:
//! - one canonical [`VisaPackage`] (pricing and processing time)
//! - a set of [`DocumentChecklistItem`]s (what applicants must provide)
//!
//! The store returns loosely-typed rows; this crate owns the single
//! normalization step that turns them into strict records.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod coerce;
pub mod document;
pub mod error;
pub mod ids;
pub mod package;

pub use coerce::{coerce_days, coerce_fee, is_present, DEFAULT_PROCESSING_DAYS};
pub use document::{
    default_document_set, validate_document_set, DocumentChecklistItem, DocumentDraft,
    DocumentRow, NewDocumentRow,
};
pub use error::ValidationError;
pub use ids::{CountryId, RecordId};
pub use package::{
    default_package_name, default_processing_time, PackageDraft, PackageFields, PackageRow,
    VisaPackage,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
