//! In-memory store
//!
//! A [`ResourceStore`] held entirely in process memory, for tests and local
//! development. Supports the failure modes the engine has to survive:
//! - queued per-operation faults ([`InMemoryStore::fail_next`])
//! - schema drift ([`InMemoryStore::drop_column`])
//! - unreachable tables ([`InMemoryStore::set_unavailable`])
//!
//! [`MemoryReconciler`] repairs drift on the same state.

use crate::error::StoreError;
use crate::schema::{SchemaReconciler, SchemaReport};
use crate::store::ResourceStore;
use crate::table::Table;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use visa_model::{CountryId, DocumentRow, NewDocumentRow, PackageFields, PackageRow, RecordId};

/// Store operations, used to target faults and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    TableColumns,
    CountryExists,
    SelectPackages,
    InsertPackage,
    UpdatePackage,
    SelectDocuments,
    DeleteDocuments,
    InsertDocuments,
    ReplaceDocuments,
}

impl StoreOp {
    /// Whether the operation writes
    #[inline]
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            StoreOp::InsertPackage
                | StoreOp::UpdatePackage
                | StoreOp::DeleteDocuments
                | StoreOp::InsertDocuments
                | StoreOp::ReplaceDocuments
        )
    }
}

#[derive(Debug)]
struct State {
    countries: HashSet<CountryId>,
    packages: Vec<PackageRow>,
    documents: Vec<DocumentRow>,
    columns: HashMap<Table, Vec<String>>,
    unavailable: HashSet<Table>,
    faults: HashMap<StoreOp, VecDeque<StoreError>>,
    calls: HashMap<StoreOp, usize>,
    last_created: Option<DateTime<Utc>>,
}

impl Default for State {
    fn default() -> Self {
        let columns = [Table::Packages, Table::Documents]
            .into_iter()
            .map(|t| {
                let cols: Vec<String> = t.required_columns().iter().map(|c| (*c).to_string()).collect();
                (t, cols)
            })
            .collect();

        Self {
            countries: HashSet::new(),
            packages: Vec::new(),
            documents: Vec::new(),
            columns,
            unavailable: HashSet::new(),
            faults: HashMap::new(),
            calls: HashMap::new(),
            last_created: None,
        }
    }
}

impl State {
    /// Count the call, then surface a queued fault or an unreachable table
    fn enter(&mut self, op: StoreOp, table: Option<Table>) -> Result<(), StoreError> {
        *self.calls.entry(op).or_insert(0) += 1;

        if let Some(err) = self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            tracing::debug!(?op, %err, "injected store fault");
            return Err(err);
        }
        match table {
            Some(t) if self.unavailable.contains(&t) => Err(StoreError::TableUnavailable(t)),
            _ => Ok(()),
        }
    }

    fn has_column(&self, table: Table, column: &str) -> bool {
        self.columns
            .get(&table)
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }

    fn require_columns(&self, table: Table, columns: &[&str]) -> Result<(), StoreError> {
        match columns.iter().find(|c| !self.has_column(table, c)) {
            Some(missing) => Err(StoreError::Query(format!(
                "column \"{missing}\" of relation \"{table}\" does not exist"
            ))),
            None => Ok(()),
        }
    }

    /// Strictly increasing creation timestamps, so ordering is stable
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(ts);
        ts
    }

    fn package_row(
        &self,
        id: RecordId,
        fields: PackageFields,
        created_at: DateTime<Utc>,
    ) -> PackageRow {
        let total_price = self
            .has_column(Table::Packages, "total_price")
            .then(|| Value::from(fields.government_fee + fields.service_fee));

        PackageRow {
            id,
            country_id: fields.country_id,
            name: Some(fields.name),
            government_fee: Some(Value::from(fields.government_fee)),
            service_fee: Some(Value::from(fields.service_fee)),
            processing_days: Some(Value::from(fields.processing_days)),
            processing_time: Some(fields.processing_time),
            total_price,
            created_at,
        }
    }

    fn insert_document_rows(&mut self, rows: Vec<NewDocumentRow>) -> Vec<DocumentRow> {
        let inserted: Vec<DocumentRow> = rows
            .into_iter()
            .map(|row| DocumentRow {
                id: RecordId::generate(),
                country_id: row.country_id,
                document_name: row.document_name,
                document_description: Some(row.document_description),
                required: Some(row.required),
                created_at: self.next_timestamp(),
            })
            .collect();
        self.documents.extend(inserted.iter().cloned());
        inserted
    }
}

const PACKAGE_WRITE_COLUMNS: &[&str] = &[
    "country_id",
    "name",
    "government_fee",
    "service_fee",
    "processing_days",
    "processing_time",
];

const DOCUMENT_WRITE_COLUMNS: &[&str] =
    &["country_id", "document_name", "document_description", "required"];

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    atomic_replace: bool,
}

impl InMemoryStore {
    /// Empty store with a complete schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise transactional document replace
    #[inline]
    #[must_use]
    pub fn with_atomic_replace(mut self) -> Self {
        self.atomic_replace = true;
        self
    }

    /// Register countries known to the country-management subsystem
    #[must_use]
    pub fn with_countries<I, C>(self, countries: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CountryId>,
    {
        {
            let mut state = self.state.lock();
            state.countries.extend(countries.into_iter().map(Into::into));
        }
        self
    }

    /// Register a single country
    pub fn add_country(&self, country_id: impl Into<CountryId>) {
        self.state.lock().countries.insert(country_id.into());
    }

    /// Insert a raw package row as-is, bypassing normalization
    pub fn seed_package_row(&self, mut row: PackageRow) -> PackageRow {
        let mut state = self.state.lock();
        row.created_at = state.next_timestamp();
        state.packages.push(row.clone());
        row
    }

    /// Insert `count` numbered documents for a country
    pub fn seed_documents(&self, country_id: &CountryId, count: usize) -> Vec<DocumentRow> {
        let rows = (1..=count)
            .map(|n| NewDocumentRow {
                country_id: country_id.clone(),
                document_name: format!("Document {n}"),
                document_description: format!("Seeded document {n}"),
                required: true,
            })
            .collect();
        self.state.lock().insert_document_rows(rows)
    }

    /// Remove a column, simulating schema drift
    pub fn drop_column(&self, table: Table, column: &str) {
        if let Some(cols) = self.state.lock().columns.get_mut(&table) {
            cols.retain(|c| c != column);
        }
    }

    /// Make a table unreachable (or reachable again)
    pub fn set_unavailable(&self, table: Table, unavailable: bool) {
        let mut state = self.state.lock();
        if unavailable {
            state.unavailable.insert(table);
        } else {
            state.unavailable.remove(&table);
        }
    }

    /// Fail the next call to `op` with `error`; queued faults fire in order
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.state.lock().faults.entry(op).or_default().push_back(error);
    }

    /// Calls made to `op`, including failed ones
    #[must_use]
    pub fn calls(&self, op: StoreOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total calls to writing operations
    #[must_use]
    pub fn mutation_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(op, _)| op.is_mutation())
            .map(|(_, n)| n)
            .sum()
    }

    /// Raw package rows for a country, insertion order
    #[must_use]
    pub fn package_rows(&self, country_id: &CountryId) -> Vec<PackageRow> {
        self.state
            .lock()
            .packages
            .iter()
            .filter(|r| &r.country_id == country_id)
            .cloned()
            .collect()
    }

    /// Raw document rows for a country, insertion order
    #[must_use]
    pub fn document_rows(&self, country_id: &CountryId) -> Vec<DocumentRow> {
        self.state
            .lock()
            .documents
            .iter()
            .filter(|r| &r.country_id == country_id)
            .cloned()
            .collect()
    }

    /// Reconciler operating on this store's schema
    #[must_use]
    pub fn reconciler(&self) -> MemoryReconciler {
        MemoryReconciler {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn table_columns(&self, table: Table) -> Result<Vec<String>, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::TableColumns, Some(table))?;
        Ok(state.columns.get(&table).cloned().unwrap_or_default())
    }

    async fn country_exists(&self, country_id: &CountryId) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::CountryExists, None)?;
        Ok(state.countries.contains(country_id))
    }

    async fn select_packages(&self, country_id: &CountryId) -> Result<Vec<PackageRow>, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::SelectPackages, Some(Table::Packages))?;
        let mut rows: Vec<PackageRow> = state
            .packages
            .iter()
            .filter(|r| &r.country_id == country_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_package(&self, fields: PackageFields) -> Result<PackageRow, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::InsertPackage, Some(Table::Packages))?;
        state.require_columns(Table::Packages, PACKAGE_WRITE_COLUMNS)?;

        let created_at = state.next_timestamp();
        let row = state.package_row(RecordId::generate(), fields, created_at);
        state.packages.push(row.clone());
        Ok(row)
    }

    async fn update_package(
        &self,
        id: &RecordId,
        fields: PackageFields,
    ) -> Result<PackageRow, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::UpdatePackage, Some(Table::Packages))?;
        state.require_columns(Table::Packages, PACKAGE_WRITE_COLUMNS)?;

        let idx = state
            .packages
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| StoreError::RowNotFound(id.clone()))?;
        let created_at = state.packages[idx].created_at;
        let row = state.package_row(id.clone(), fields, created_at);
        state.packages[idx] = row.clone();
        Ok(row)
    }

    async fn select_documents(
        &self,
        country_id: &CountryId,
    ) -> Result<Vec<DocumentRow>, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::SelectDocuments, Some(Table::Documents))?;
        let mut rows: Vec<DocumentRow> = state
            .documents
            .iter()
            .filter(|r| &r.country_id == country_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn delete_documents(&self, country_id: &CountryId) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::DeleteDocuments, Some(Table::Documents))?;
        let before = state.documents.len();
        state.documents.retain(|r| &r.country_id != country_id);
        Ok(before - state.documents.len())
    }

    async fn insert_documents(
        &self,
        rows: Vec<NewDocumentRow>,
    ) -> Result<Vec<DocumentRow>, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::InsertDocuments, Some(Table::Documents))?;
        state.require_columns(Table::Documents, DOCUMENT_WRITE_COLUMNS)?;
        Ok(state.insert_document_rows(rows))
    }

    fn supports_atomic_replace(&self) -> bool {
        self.atomic_replace
    }

    async fn replace_documents(
        &self,
        country_id: &CountryId,
        rows: Vec<NewDocumentRow>,
    ) -> Result<Vec<DocumentRow>, StoreError> {
        if !self.atomic_replace {
            return Err(StoreError::Unsupported("replace_documents"));
        }
        let mut state = self.state.lock();
        state.enter(StoreOp::ReplaceDocuments, Some(Table::Documents))?;
        state.require_columns(Table::Documents, DOCUMENT_WRITE_COLUMNS)?;
        state.documents.retain(|r| &r.country_id != country_id);
        Ok(state.insert_document_rows(rows))
    }
}

/// Restores the expected columns of an [`InMemoryStore`] and backfills the
/// generated total on rows written while it was missing
#[derive(Debug, Clone)]
pub struct MemoryReconciler {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl SchemaReconciler for MemoryReconciler {
    async fn fix_schema(&self) -> SchemaReport {
        let mut state = self.state.lock();
        let mut restored = Vec::new();

        for table in [Table::Packages, Table::Documents] {
            if state.unavailable.contains(&table) {
                return SchemaReport::failed(format!("cannot reach table {table}"));
            }
            let cols = state.columns.entry(table).or_default();
            let missing = table.missing_columns(cols.as_slice());
            for column in missing {
                cols.push(column.to_string());
                restored.push(format!("{table}.{column}"));
            }
        }

        let mut backfilled = 0usize;
        for row in state.packages.iter_mut().filter(|r| r.total_price.is_none()) {
            let total = visa_model::coerce_fee(row.government_fee.as_ref())
                + visa_model::coerce_fee(row.service_fee.as_ref());
            row.total_price = Some(Value::from(total));
            backfilled += 1;
        }

        if restored.is_empty() && backfilled == 0 {
            SchemaReport::ok("Schema is up to date")
        } else {
            SchemaReport::ok(format!(
                "Restored columns [{}], backfilled {backfilled} total(s)",
                restored.join(", ")
            ))
        }
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
