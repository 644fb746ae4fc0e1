//! Visa Engine - consistency engine for per-country visa configuration
//!
//! Keeps each country's pricing package and document checklist in a
//! coherent state:
//! - Repositories for packages and documents over a [`ResourceStore`]
//! - Diagnostics that find (and for missing packages, fix) problems
//! - A repair orchestrator sequencing schema repair, writes and diagnostics
//! - Cache invalidation after every persisted change
//! - A state façade with observable idle/loading/ready/failed states
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use visa_engine::prelude::*;
//! use visa_store::InMemoryStore;
//!
//! # async fn example() {
//! let store = InMemoryStore::new().with_countries(["jp"]);
//! let orchestrator = RepairOrchestrator::new(
//!     Arc::new(store.clone()),
//!     Arc::new(store.reconciler()),
//!     Arc::new(ReadViewCache::default()),
//!     &EngineConfig::default(),
//! );
//! let facade = StateFacade::new(Arc::new(orchestrator));
//!
//! let outcome = facade.toggle_package(&CountryId::new("jp"), true).await;
//! assert!(outcome.success);
//! # }
//! ```
//!
//! [`ResourceStore`]: visa_store::ResourceStore

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod documents;
pub mod error;
pub mod facade;
pub mod fallback;
pub mod orchestrator;
pub mod package;
pub mod telemetry;

// Re-exports for convenience
pub use cache::{CacheInvalidator, InvalidationEvent, NoopInvalidator, ReadViewCache, ViewKey};
pub use config::{ConfigError, EngineConfig};
pub use diagnostic::{
    CheckStage, DiagnosticChecks, DiagnosticEngine, DiagnosticResult, DocumentCheck, PackageCheck,
    PackageIssue, TableCheck,
};
pub use documents::{DocumentRepository, EnsureReport, ReplaceMode};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use facade::{OperationKind, OperationState, Outcome, StateFacade};
pub use fallback::ReconcilerChain;
pub use orchestrator::{CountryConfiguration, RepairOrchestrator, ToggleOutcome};
pub use package::PackageRepository;
pub use telemetry::{init_test_tracing, init_tracing, LogFormat};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{
        CacheInvalidator, DiagnosticResult, EngineConfig, EngineError, EngineResult,
        OperationState, Outcome, ReadViewCache, RepairOrchestrator, StateFacade,
    };
    pub use visa_model::{CountryId, DocumentDraft, PackageDraft, VisaPackage};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
