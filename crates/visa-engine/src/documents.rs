//! Document repository
//!
//! Checklist items for a country are replaced as a set. Unless the store
//! offers a transactional replace, a save is two separate calls:
//!
//! ```text
//! delete_documents(country) ──ok──▶ insert_documents(rows) ──ok──▶ done
//!          │ err                           │ err
//!          ▼                               ▼
//!   StoreError, nothing changed     PartialFailure, country has NO documents
//! ```
//!
//! The second failure state is reported, never rolled back.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use visa_model::{
    validate_document_set, CountryId, DocumentChecklistItem, DocumentDraft, NewDocumentRow,
    ValidationError,
};
use visa_store::ResourceStore;

/// How a replacement set reaches the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// Delete, then insert; may strand the country with no documents
    TwoPhase,
    /// Single store transaction
    Atomic,
}

/// Result of `ensure_default_documents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureReport {
    /// Country checked
    pub country_id: CountryId,
    /// Documents inserted by this call
    pub created: usize,
    /// Documents were already present; nothing was written
    pub already_present: bool,
    /// The existence check failed and was ignored
    pub existence_check_failed: bool,
}

/// Repository for per-country document checklists
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    store: Arc<dyn ResourceStore>,
    defaults: Vec<DocumentDraft>,
    prefer_atomic: bool,
}

impl DocumentRepository {
    /// Create repository over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, defaults: Vec<DocumentDraft>) -> Self {
        Self {
            store,
            defaults,
            prefer_atomic: false,
        }
    }

    /// Use the store's transactional replace when it has one
    #[inline]
    #[must_use]
    pub fn with_transactional_replace(mut self, enabled: bool) -> Self {
        self.prefer_atomic = enabled;
        self
    }

    /// Mode the next save will use
    #[inline]
    #[must_use]
    pub fn replace_mode(&self) -> ReplaceMode {
        if self.prefer_atomic && self.store.supports_atomic_replace() {
            ReplaceMode::Atomic
        } else {
            ReplaceMode::TwoPhase
        }
    }

    /// Documents in creation order, surfacing read failures
    ///
    /// # Errors
    /// `EngineError::Store` when the select fails.
    pub async fn try_fetch_documents(
        &self,
        country_id: &CountryId,
    ) -> EngineResult<Vec<DocumentChecklistItem>> {
        let rows = self.store.select_documents(country_id).await?;
        Ok(rows.into_iter().map(DocumentChecklistItem::from).collect())
    }

    /// Documents in creation order.
    ///
    /// A failed read is logged and returned as an empty list, so an empty
    /// result means "none, or unknown".
    pub async fn fetch_documents(&self, country_id: &CountryId) -> Vec<DocumentChecklistItem> {
        match self.try_fetch_documents(country_id).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(country = %country_id, error = %e, "document read failed, returning empty list");
                Vec::new()
            }
        }
    }

    /// Replace every document of a country with `items`.
    ///
    /// # Errors
    /// - `EngineError::Validation` for an empty set, a blank field or a blank
    ///   country id; the store is not called
    /// - `EngineError::Store` when the delete (or atomic replace) fails
    /// - `EngineError::PartialFailure` when the delete went through and the
    ///   insert did not
    pub async fn save_documents(
        &self,
        country_id: &CountryId,
        items: &[DocumentDraft],
    ) -> EngineResult<Vec<DocumentChecklistItem>> {
        if country_id.is_blank() {
            return Err(ValidationError::MissingCountryId.into());
        }
        let rows = validate_document_set(country_id, items)?;

        let inserted = match self.replace_mode() {
            ReplaceMode::Atomic => self.store.replace_documents(country_id, rows).await?,
            ReplaceMode::TwoPhase => self.replace_two_phase(country_id, rows).await?,
        };

        tracing::info!(country = %country_id, count = inserted.len(), "documents replaced");
        Ok(inserted.into_iter().map(DocumentChecklistItem::from).collect())
    }

    async fn replace_two_phase(
        &self,
        country_id: &CountryId,
        rows: Vec<NewDocumentRow>,
    ) -> EngineResult<Vec<visa_model::DocumentRow>> {
        let count = rows.len();
        let deleted = self.store.delete_documents(country_id).await.map_err(|e| {
            tracing::error!(country = %country_id, error = %e, "document delete failed, insert skipped");
            e
        })?;
        tracing::debug!(country = %country_id, deleted, "existing documents deleted");

        self.store.insert_documents(rows).await.map_err(|e| {
            tracing::error!(
                country = %country_id,
                error = %e,
                "document insert failed after delete; country has no documents"
            );
            EngineError::partial(
                format!("deleted {deleted} existing document(s) for {country_id}"),
                format!("inserting {count} document(s) failed: {e}; {country_id} now has no documents"),
            )
        })
    }

    /// Seed the default checklist if the country has none.
    ///
    /// A failed existence check does not stop the insert.
    ///
    /// # Errors
    /// - `EngineError::Validation` when the configured defaults are invalid
    /// - `EngineError::Store` when the insert fails
    pub async fn ensure_default_documents(
        &self,
        country_id: &CountryId,
    ) -> EngineResult<EnsureReport> {
        let mut report = EnsureReport {
            country_id: country_id.clone(),
            created: 0,
            already_present: false,
            existence_check_failed: false,
        };

        match self.store.select_documents(country_id).await {
            Ok(existing) if !existing.is_empty() => {
                tracing::debug!(country = %country_id, count = existing.len(), "documents present, nothing to seed");
                report.already_present = true;
                return Ok(report);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(country = %country_id, error = %e, "document existence check failed, seeding anyway");
                report.existence_check_failed = true;
            }
        }

        let rows = validate_document_set(country_id, &self.defaults)?;
        let inserted = self.store.insert_documents(rows).await?;
        report.created = inserted.len();
        tracing::info!(country = %country_id, created = report.created, "default documents seeded");
        Ok(report)
    }
}
