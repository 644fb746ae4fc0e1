//! Resource store client contract
//!
//! The engine never talks to a concrete database. Anything that can answer
//! these queries for the package and document tables can back it.

use crate::error::StoreError;
use crate::table::Table;
use async_trait::async_trait;
use visa_model::{CountryId, DocumentRow, NewDocumentRow, PackageFields, PackageRow, RecordId};

/// Async client for the package and document tables
#[async_trait]
pub trait ResourceStore: Send + Sync + std::fmt::Debug {
    /// Columns currently present on `table`.
    ///
    /// # Errors
    /// `StoreError::TableUnavailable` when the table cannot be reached.
    async fn table_columns(&self, table: Table) -> Result<Vec<String>, StoreError>;

    /// Whether the country-management subsystem knows this country
    async fn country_exists(&self, country_id: &CountryId) -> Result<bool, StoreError>;

    /// All package rows for a country, newest first
    async fn select_packages(&self, country_id: &CountryId) -> Result<Vec<PackageRow>, StoreError>;

    /// Insert a package row and return it as stored
    async fn insert_package(&self, fields: PackageFields) -> Result<PackageRow, StoreError>;

    /// Overwrite the row with `id`
    ///
    /// # Errors
    /// `StoreError::RowNotFound` when no such row exists.
    async fn update_package(
        &self,
        id: &RecordId,
        fields: PackageFields,
    ) -> Result<PackageRow, StoreError>;

    /// All document rows for a country, oldest first
    async fn select_documents(&self, country_id: &CountryId)
        -> Result<Vec<DocumentRow>, StoreError>;

    /// Delete every document row for a country, returning how many went
    async fn delete_documents(&self, country_id: &CountryId) -> Result<usize, StoreError>;

    /// Bulk insert, all rows or none
    async fn insert_documents(
        &self,
        rows: Vec<NewDocumentRow>,
    ) -> Result<Vec<DocumentRow>, StoreError>;

    /// Whether [`ResourceStore::replace_documents`] runs as one transaction
    fn supports_atomic_replace(&self) -> bool {
        false
    }

    /// Delete and insert in a single transaction
    ///
    /// # Errors
    /// `StoreError::Unsupported` unless the store overrides it.
    async fn replace_documents(
        &self,
        _country_id: &CountryId,
        _rows: Vec<NewDocumentRow>,
    ) -> Result<Vec<DocumentRow>, StoreError> {
        Err(StoreError::Unsupported("replace_documents"))
    }
}
