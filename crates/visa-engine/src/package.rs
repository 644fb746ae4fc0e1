//! Package repository
//!
//! Fetch, create-or-update and status toggle for the one canonical
//! [`VisaPackage`] of a country. When the store holds several rows for a
//! country the newest wins; the others are left alone.

use crate::error::EngineResult;
use std::sync::Arc;
use visa_model::{CountryId, PackageDraft, PackageFields, PackageRow, ValidationError, VisaPackage};
use visa_store::ResourceStore;

/// Repository for per-country pricing packages
#[derive(Debug, Clone)]
pub struct PackageRepository {
    store: Arc<dyn ResourceStore>,
    default_days: u32,
}

impl PackageRepository {
    /// Create repository over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, default_days: u32) -> Self {
        Self {
            store,
            default_days,
        }
    }

    /// Processing days used when a stored or submitted value is unusable
    #[inline]
    #[must_use]
    pub fn default_days(&self) -> u32 {
        self.default_days
    }

    /// Normalize a raw row the same way fetches do
    #[inline]
    #[must_use]
    pub fn normalize_row(&self, row: &PackageRow) -> VisaPackage {
        VisaPackage::from_row(row, self.default_days)
    }

    /// Canonical raw row, without normalization
    ///
    /// # Errors
    /// `EngineError::Store` when the select fails.
    pub async fn fetch_package_row(
        &self,
        country_id: &CountryId,
    ) -> EngineResult<Option<PackageRow>> {
        let rows = self.store.select_packages(country_id).await?;
        if rows.len() > 1 {
            tracing::debug!(
                country = %country_id,
                duplicates = rows.len() - 1,
                "multiple package rows, using newest"
            );
        }
        Ok(rows.into_iter().next())
    }

    /// Canonical package for a country, `None` when there is none
    ///
    /// # Errors
    /// `EngineError::Store` when the select fails.
    pub async fn fetch_package(
        &self,
        country_id: &CountryId,
    ) -> EngineResult<Option<VisaPackage>> {
        Ok(self
            .fetch_package_row(country_id)
            .await?
            .map(|row| VisaPackage::from_row(&row, self.default_days)))
    }

    /// Create or update the package described by `draft`.
    ///
    /// Target row: `draft.id` if given, else the canonical row for the
    /// country, else a new row.
    ///
    /// # Errors
    /// - `EngineError::Validation` for a blank country id (no store call made)
    /// - `EngineError::Store` when the lookup or write fails
    pub async fn save_package(&self, draft: &PackageDraft) -> EngineResult<VisaPackage> {
        if draft.country_id.is_blank() {
            return Err(ValidationError::MissingCountryId.into());
        }
        let fields = draft.normalize(self.default_days);
        let is_active = draft.is_active.unwrap_or(true);

        let target = match &draft.id {
            Some(id) => Some(id.clone()),
            None => self
                .fetch_package_row(&draft.country_id)
                .await?
                .map(|row| row.id),
        };

        let row = match target {
            Some(id) => {
                tracing::debug!(country = %draft.country_id, %id, "updating package");
                self.store.update_package(&id, fields).await?
            }
            None => {
                tracing::debug!(country = %draft.country_id, "inserting package");
                self.store.insert_package(fields).await?
            }
        };

        let saved = VisaPackage::from_row(&row, self.default_days).with_active(is_active);
        tracing::info!(
            country = %saved.country_id,
            total_price = saved.total_price,
            "package saved"
        );
        Ok(saved)
    }

    /// Insert a zero-fee package with default processing time
    ///
    /// # Errors
    /// `EngineError::Store` when the insert fails.
    pub async fn create_default_package(
        &self,
        country_id: &CountryId,
    ) -> EngineResult<VisaPackage> {
        let fields = PackageFields::default_for(country_id, self.default_days);
        let row = self.store.insert_package(fields).await?;
        tracing::info!(country = %country_id, "created default package");
        Ok(VisaPackage::from_row(&row, self.default_days))
    }

    /// Attach an active flag to the country's package, creating a default
    /// package first if none exists.
    ///
    /// The flag is not persisted; no stored field changes unless the default
    /// package had to be created.
    ///
    /// # Errors
    /// `EngineError::Store` when the lookup or the default insert fails.
    pub async fn toggle_active(
        &self,
        country_id: &CountryId,
        is_active: bool,
    ) -> EngineResult<VisaPackage> {
        let package = match self.fetch_package(country_id).await? {
            Some(package) => package,
            None => self
                .create_default_package(country_id)
                .await
                .map_err(|e| {
                    tracing::error!(
                        country = %country_id,
                        error = %e,
                        "default package creation failed"
                    );
                    e
                })?,
        };

        tracing::info!(country = %country_id, is_active, "package status toggled");
        Ok(package.with_active(is_active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use visa_model::RecordId;
    use visa_store::{InMemoryStore, StoreError, StoreOp};

    fn repo() -> (InMemoryStore, PackageRepository) {
        let store = InMemoryStore::new();
        let repo = PackageRepository::new(Arc::new(store.clone()), 15);
        (store, repo)
    }

    #[tokio::test]
    async fn fetch_missing_package_is_none() {
        let (_, repo) = repo();
        assert!(repo.fetch_package(&CountryId::new("jp")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_inserts_then_updates_same_row() {
        let (store, repo) = repo();
        let country = CountryId::new("jp");

        let first = repo
            .save_package(&PackageDraft::new("jp").with_fees(30.0, 20.0))
            .await
            .unwrap();
        let second = repo
            .save_package(&PackageDraft::new("jp").with_fees(40.0, 20.0))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.total_price, 60.0);
        assert_eq!(store.package_rows(&country).len(), 1);
    }

    #[tokio::test]
    async fn save_coerces_garbage_fees() {
        let (_, repo) = repo();
        let saved = repo
            .save_package(&PackageDraft::new("in").with_raw_fees(json!("abc"), json!("12.5")))
            .await
            .unwrap();
        assert_eq!(saved.government_fee, 0.0);
        assert_eq!(saved.service_fee, 12.5);
        assert_eq!(saved.total_price, 12.5);
        assert_eq!(saved.processing_days, 15);
        assert_eq!(saved.processing_time, "15 days");
    }

    #[tokio::test]
    async fn save_with_explicit_id_targets_that_row() {
        let (store, repo) = repo();
        let older = repo.create_default_package(&CountryId::new("kr")).await.unwrap();
        repo.create_default_package(&CountryId::new("kr")).await.unwrap();

        let draft = PackageDraft::new("kr")
            .with_id(older.id.clone().unwrap())
            .with_fees(1.0, 2.0);
        repo.save_package(&draft).await.unwrap();

        let rows = store.package_rows(&CountryId::new("kr"));
        assert_eq!(rows[0].id, older.id.unwrap());
        assert_eq!(rows[0].total_price, Some(json!(3.0)));
    }

    #[tokio::test]
    async fn fetch_prefers_newest_duplicate() {
        let (_, repo) = repo();
        let country = CountryId::new("mx");
        repo.create_default_package(&country).await.unwrap();
        let newest = repo.create_default_package(&country).await.unwrap();

        let fetched = repo.fetch_package(&country).await.unwrap().unwrap();
        assert_eq!(fetched.id, newest.id);
    }

    #[tokio::test]
    async fn save_requires_country_id() {
        let (store, repo) = repo();
        let err = repo.save_package(&PackageDraft::default()).await.unwrap_err();
        assert_eq!(err, EngineError::Validation(ValidationError::MissingCountryId));
        assert_eq!(store.calls(StoreOp::SelectPackages), 0);
    }

    #[tokio::test]
    async fn save_surfaces_store_failure_without_retry() {
        let (store, repo) = repo();
        store.fail_next(StoreOp::InsertPackage, StoreError::PermissionDenied("rls".into()));

        let err = repo.save_package(&PackageDraft::new("eg")).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::PermissionDenied(_))));
        assert_eq!(store.calls(StoreOp::InsertPackage), 1);
    }

    #[tokio::test]
    async fn save_unknown_id_is_store_error() {
        let (_, repo) = repo();
        let draft = PackageDraft::new("eg").with_id(RecordId::new("ghost"));
        let err = repo.save_package(&draft).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::RowNotFound(_))));
    }

    #[tokio::test]
    async fn save_keeps_explicit_inactive_flag() {
        let (_, repo) = repo();
        let saved = repo
            .save_package(&PackageDraft::new("ar").with_active(false))
            .await
            .unwrap();
        assert!(!saved.is_active);
    }

    #[tokio::test]
    async fn toggle_creates_default_when_missing() {
        let (store, repo) = repo();
        let country = CountryId::new("cl");

        let toggled = repo.toggle_active(&country, false).await.unwrap();
        assert!(!toggled.is_active);
        assert_eq!(toggled.total_price, 0.0);
        assert_eq!(store.package_rows(&country).len(), 1);

        // the flag is not persisted
        let fetched = repo.fetch_package(&country).await.unwrap().unwrap();
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn activated_package_reads_back_active() {
        let (store, repo) = repo();
        let country = CountryId::new("cl");

        let toggled = repo.toggle_active(&country, true).await.unwrap();
        assert!(toggled.is_active);

        let fetched = repo.fetch_package(&country).await.unwrap().unwrap();
        assert!(fetched.is_active);
        assert_eq!(fetched.id, toggled.id);
        assert_eq!(store.package_rows(&country).len(), 1);
    }

    #[tokio::test]
    async fn toggle_existing_package_writes_nothing() {
        let (store, repo) = repo();
        let country = CountryId::new("pe");
        repo.create_default_package(&country).await.unwrap();
        let before = store.mutation_calls();

        repo.toggle_active(&country, true).await.unwrap();
        assert_eq!(store.mutation_calls(), before);
    }

    #[tokio::test]
    async fn toggle_fails_when_default_insert_fails() {
        let (store, repo) = repo();
        store.fail_next(StoreOp::InsertPackage, StoreError::Connection("down".into()));
        let err = repo.toggle_active(&CountryId::new("uy"), true).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
