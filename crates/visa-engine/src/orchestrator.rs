//! Repair orchestrator
//!
//! Sequences the schema reconciler, both repositories and the diagnostic
//! engine into the multi-step operations callers see, and fires cache
//! invalidation after every write that persisted something.
//!
//! Nothing here is transactional. Schema repairs are permanent even when a
//! later step fails, and a failed step is never rolled back.

use crate::cache::CacheInvalidator;
use crate::config::EngineConfig;
use crate::diagnostic::{DiagnosticEngine, DiagnosticResult};
use crate::documents::{DocumentRepository, EnsureReport};
use crate::error::{EngineError, EngineResult};
use crate::package::PackageRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use visa_model::{
    validate_document_set, CountryId, DocumentChecklistItem, DocumentDraft, PackageDraft,
    ValidationError, VisaPackage,
};
use visa_store::{ResourceStore, SchemaReconciler};

/// Result of `toggle_package_and_ensure_documents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    /// Package with the requested flag attached
    pub package: VisaPackage,
    /// Package as read back after the toggle
    pub refreshed_package: Option<VisaPackage>,
    /// Documents as read back after the toggle
    pub documents: Vec<DocumentChecklistItem>,
    /// Seeding report, when the package was activated and seeding succeeded
    pub ensure: Option<EnsureReport>,
    /// Seeding failure, logged and not escalated
    pub ensure_error: Option<String>,
}

/// Result of `save_country_configuration`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryConfiguration {
    pub package: VisaPackage,
    pub documents: Vec<DocumentChecklistItem>,
}

/// Multi-step workflows over the repositories
#[derive(Debug, Clone)]
pub struct RepairOrchestrator {
    reconciler: Arc<dyn SchemaReconciler>,
    invalidator: Arc<dyn CacheInvalidator>,
    packages: PackageRepository,
    documents: DocumentRepository,
    diagnostics: DiagnosticEngine,
    repair_tool: String,
}

impl RepairOrchestrator {
    /// Wire repositories and diagnostics over one store
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        reconciler: Arc<dyn SchemaReconciler>,
        invalidator: Arc<dyn CacheInvalidator>,
        config: &EngineConfig,
    ) -> Self {
        let packages = PackageRepository::new(Arc::clone(&store), config.default_processing_days);
        let documents = DocumentRepository::new(Arc::clone(&store), config.default_documents.clone())
            .with_transactional_replace(config.transactional_replace);
        let diagnostics = DiagnosticEngine::new(store, packages.clone(), documents.clone());

        Self {
            reconciler,
            invalidator,
            packages,
            documents,
            diagnostics,
            repair_tool: config.schema_repair_tool.clone(),
        }
    }

    /// Package repository
    #[inline]
    #[must_use]
    pub fn packages(&self) -> &PackageRepository {
        &self.packages
    }

    /// Document repository
    #[inline]
    #[must_use]
    pub fn documents(&self) -> &DocumentRepository {
        &self.documents
    }

    /// Diagnostic engine
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticEngine {
        &self.diagnostics
    }

    /// Canonical package for a country
    ///
    /// # Errors
    /// `EngineError::Store` when the read fails.
    pub async fn fetch_package(
        &self,
        country_id: &CountryId,
    ) -> EngineResult<Option<VisaPackage>> {
        self.packages.fetch_package(country_id).await
    }

    /// Documents for a country; empty on read failure
    pub async fn fetch_documents(&self, country_id: &CountryId) -> Vec<DocumentChecklistItem> {
        self.documents.fetch_documents(country_id).await
    }

    /// Package-only diagnostic
    pub async fn run_diagnostic(&self, country_id: &CountryId) -> DiagnosticResult {
        self.diagnostics.run_diagnostic(country_id).await
    }

    /// Package and document diagnostic
    pub async fn run_country_diagnostic(&self, country_id: &CountryId) -> DiagnosticResult {
        self.diagnostics.run_country_diagnostic(country_id).await
    }

    /// Repair the schema, then diagnose the country.
    ///
    /// A reconciler failure is returned with its message unchanged and
    /// `schema_fixed == Some(false)`; the diagnostic is not run.
    pub async fn refresh_schema_and_data(&self, country_id: &CountryId) -> DiagnosticResult {
        tracing::info!(
            country = %country_id,
            reconciler = self.reconciler.name(),
            "refreshing schema"
        );
        let report = self.reconciler.fix_schema().await;
        if !report.success {
            tracing::warn!(
                country = %country_id,
                message = %report.message,
                "schema refresh failed"
            );
            return DiagnosticResult::schema_refused(
                report.message,
                format!("Run the database repair tool ({}) and try again", self.repair_tool),
            )
            .with_schema_fixed(false);
        }

        tracing::debug!(message = %report.message, "schema reconciled");
        self.diagnostics
            .run_country_diagnostic(country_id)
            .await
            .with_schema_fixed(true)
    }

    /// Set a package's active flag, seeding default documents on activation.
    ///
    /// Steps: schema gate, toggle (creates a default package if needed),
    /// best-effort document seeding, invalidation, read-back.
    ///
    /// # Errors
    /// - `EngineError::SchemaGate` when the reconciler fails; nothing is written
    /// - `EngineError::Store` when the toggle fails
    pub async fn toggle_package_and_ensure_documents(
        &self,
        country_id: &CountryId,
        is_active: bool,
    ) -> EngineResult<ToggleOutcome> {
        tracing::info!(country = %country_id, is_active, "toggling package");
        self.schema_gate().await?;

        let package = self.packages.toggle_active(country_id, is_active).await?;

        let (ensure, ensure_error) = if is_active {
            match self.documents.ensure_default_documents(country_id).await {
                Ok(report) => (Some(report), None),
                Err(e) => {
                    tracing::warn!(country = %country_id, error = %e, "default document seeding failed");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        self.invalidator.invalidate(country_id).await;

        let refreshed_package = match self.packages.fetch_package(country_id).await {
            Ok(package) => package,
            Err(e) => {
                tracing::warn!(country = %country_id, error = %e, "package read-back failed");
                None
            }
        };
        let documents = self.documents.fetch_documents(country_id).await;

        tracing::info!(
            country = %country_id,
            is_active,
            documents = documents.len(),
            "package toggled"
        );
        Ok(ToggleOutcome {
            package,
            refreshed_package,
            documents,
            ensure,
            ensure_error,
        })
    }

    /// Save a package and invalidate its views
    ///
    /// # Errors
    /// As [`PackageRepository::save_package`].
    pub async fn save_package(&self, draft: &PackageDraft) -> EngineResult<VisaPackage> {
        let saved = self.packages.save_package(draft).await?;
        self.invalidator.invalidate(&saved.country_id).await;
        Ok(saved)
    }

    /// Replace a country's documents and invalidate its views.
    ///
    /// A partial failure still invalidates, since the delete went through.
    ///
    /// # Errors
    /// As [`DocumentRepository::save_documents`].
    pub async fn save_documents(
        &self,
        country_id: &CountryId,
        items: &[DocumentDraft],
    ) -> EngineResult<Vec<DocumentChecklistItem>> {
        let result = self.documents.save_documents(country_id, items).await;
        if matches!(&result, Ok(_) | Err(EngineError::PartialFailure { .. })) {
            self.invalidator.invalidate(country_id).await;
        }
        result
    }

    /// Save package and documents of one country in sequence.
    ///
    /// Inputs are validated before the first write. Once the package is
    /// saved, any document failure is reported as a partial failure listing
    /// both steps.
    ///
    /// # Errors
    /// - `EngineError::Validation` for bad input; nothing is written
    /// - `EngineError::SchemaGate` when the reconciler fails
    /// - `EngineError::Store` when the package save fails
    /// - `EngineError::PartialFailure` when the package saved and documents did not
    pub async fn save_country_configuration(
        &self,
        package: &PackageDraft,
        documents: &[DocumentDraft],
    ) -> EngineResult<CountryConfiguration> {
        let country_id = package.country_id.clone();
        if country_id.is_blank() {
            return Err(ValidationError::MissingCountryId.into());
        }
        validate_document_set(&country_id, documents)?;
        self.schema_gate().await?;

        let saved = self.packages.save_package(package).await?;
        let result = match self.documents.save_documents(&country_id, documents).await {
            Ok(items) => Ok(CountryConfiguration {
                package: saved,
                documents: items,
            }),
            Err(e) => {
                let mut completed = vec![format!("package saved for {country_id}")];
                let failures = match e {
                    EngineError::PartialFailure {
                        completed: steps,
                        failures,
                    } => {
                        completed.extend(steps);
                        failures
                    }
                    other => vec![format!("saving documents failed: {other}")],
                };
                tracing::error!(country = %country_id, ?failures, "country configuration partially saved");
                Err(EngineError::PartialFailure {
                    completed,
                    failures,
                })
            }
        };

        self.invalidator.invalidate(&country_id).await;
        result
    }

    async fn schema_gate(&self) -> EngineResult<()> {
        let report = self.reconciler.fix_schema().await;
        if report.success {
            return Ok(());
        }
        tracing::error!(message = %report.message, "schema gate closed, aborting");
        Err(EngineError::SchemaGate {
            message: report.message,
            hint: self.repair_tool.clone(),
        })
    }
}
