//! Diagnostic engine
//!
//! Inspects one country's package (and optionally its documents) and reports
//! what is wrong. Checks run in a fixed order and stop at the first failure:
//!
//! 1. package table reachable with all required columns
//! 2. country exists
//! 3. package exists (if not, a zero-fee default is created and the run
//!    succeeds with a note)
//! 4. package fields complete
//! 5. documents, country variant only; informational, never fail the run
//!
//! A failed diagnostic is a normal result, not an error.

use crate::documents::DocumentRepository;
use crate::error::ErrorKind;
use crate::package::PackageRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use visa_model::{is_present, CountryId, PackageRow, VisaPackage};
use visa_store::{ResourceStore, Table};

/// Outcome of one diagnostic run; superseded by the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
    /// Whether every evaluated check passed
    pub success: bool,
    /// Classification of the deciding failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Summary, taken from the deciding check
    pub message: String,
    /// Suggested operator actions, most important first
    pub recommendations: Vec<String>,
    /// Sub-check details
    pub results: DiagnosticChecks,
    /// Set by schema refresh runs
    pub schema_fixed: Option<bool>,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticResult {
    fn finish(
        success: bool,
        message: String,
        recommendations: Vec<String>,
        results: DiagnosticChecks,
    ) -> Self {
        Self {
            success,
            error_kind: None,
            message,
            recommendations,
            results,
            schema_fixed: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed result with no sub-checks, used when the schema reconciler
    /// refused and no check could run
    #[must_use]
    pub fn schema_refused(
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        let mut result = Self::finish(
            false,
            message.into(),
            vec![recommendation.into()],
            DiagnosticChecks::default(),
        );
        result.error_kind = Some(ErrorKind::SchemaGate);
        result
    }

    /// Annotate with the schema reconciler outcome
    #[inline]
    #[must_use]
    pub fn with_schema_fixed(mut self, fixed: bool) -> Self {
        self.schema_fixed = Some(fixed);
        self
    }
}

/// Which check decided a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStage {
    PackageTable,
    Country,
    PackageLookup,
    PackageQuality,
}

/// Sub-check details; checks that did not run stay `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticChecks {
    /// Package table structure
    pub package_table: Option<TableCheck>,
    /// Country existence
    pub country_exists: Option<bool>,
    /// Package existence and quality
    pub package: Option<PackageCheck>,
    /// Document table structure
    pub document_table: Option<TableCheck>,
    /// Document existence and count
    pub documents: Option<DocumentCheck>,
    /// Check that failed the run
    pub failed_stage: Option<CheckStage>,
}

/// Table reachability and required columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCheck {
    pub table: Table,
    pub accessible: bool,
    pub missing_columns: Vec<String>,
    pub error: Option<String>,
}

impl TableCheck {
    /// Reachable and complete
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.accessible && self.missing_columns.is_empty()
    }
}

/// Problems found on an existing package row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageIssue {
    MissingName,
    MissingGovernmentFee,
    MissingServiceFee,
    MissingProcessingDays,
}

impl std::fmt::Display for PackageIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PackageIssue::MissingName => "Missing package name",
            PackageIssue::MissingGovernmentFee => "Missing government fee",
            PackageIssue::MissingServiceFee => "Missing service fee",
            PackageIssue::MissingProcessingDays => "Missing processing days",
        })
    }
}

impl PackageIssue {
    /// Issues present on a raw row
    #[must_use]
    pub fn inspect(row: &PackageRow) -> Vec<PackageIssue> {
        let mut issues = Vec::new();
        if !matches!(row.name.as_deref(), Some(n) if !n.trim().is_empty()) {
            issues.push(PackageIssue::MissingName);
        }
        if !is_present(row.government_fee.as_ref()) {
            issues.push(PackageIssue::MissingGovernmentFee);
        }
        if !is_present(row.service_fee.as_ref()) {
            issues.push(PackageIssue::MissingServiceFee);
        }
        if !is_present(row.processing_days.as_ref()) {
            issues.push(PackageIssue::MissingProcessingDays);
        }
        issues
    }
}

/// Package existence and quality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageCheck {
    pub exists: bool,
    pub is_active: bool,
    pub created_default: bool,
    pub issues: Vec<PackageIssue>,
    pub snapshot: Option<VisaPackage>,
}

/// Document existence and count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCheck {
    pub accessible: bool,
    pub exists: bool,
    pub count: usize,
    pub error: Option<String>,
}

/// Read-mostly evaluator of a country's configuration
#[derive(Debug, Clone)]
pub struct DiagnosticEngine {
    store: Arc<dyn ResourceStore>,
    packages: PackageRepository,
    documents: DocumentRepository,
}

impl DiagnosticEngine {
    /// Create engine over the same store as the repositories
    #[inline]
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        packages: PackageRepository,
        documents: DocumentRepository,
    ) -> Self {
        Self {
            store,
            packages,
            documents,
        }
    }

    /// Package checks only
    pub async fn run_diagnostic(&self, country_id: &CountryId) -> DiagnosticResult {
        self.run(country_id, false).await
    }

    /// Package checks followed by document checks
    pub async fn run_country_diagnostic(&self, country_id: &CountryId) -> DiagnosticResult {
        self.run(country_id, true).await
    }

    async fn run(&self, country_id: &CountryId, with_documents: bool) -> DiagnosticResult {
        tracing::info!(country = %country_id, with_documents, "running diagnostic");
        let mut checks = DiagnosticChecks::default();
        let mut recommendations = Vec::new();

        // 1. structure
        let table = self.check_table(Table::Packages).await;
        let table_ok = table.passed();
        checks.package_table = Some(table.clone());
        if !table_ok {
            let message = match &table.error {
                Some(e) => format!("Package table is not accessible: {e}"),
                None => format!(
                    "Package table is missing columns: {}",
                    table.missing_columns.join(", ")
                ),
            };
            recommendations
                .push("Run the schema refresh to restore the package table structure".to_string());
            return fail(
                message,
                recommendations,
                checks,
                CheckStage::PackageTable,
                ErrorKind::Store,
            );
        }

        // 2. country
        match self.store.country_exists(country_id).await {
            Ok(true) => checks.country_exists = Some(true),
            Ok(false) => {
                checks.country_exists = Some(false);
                recommendations
                    .push("Verify the country id or create the country first".to_string());
                return fail(
                    format!("Country {country_id} not found"),
                    recommendations,
                    checks,
                    CheckStage::Country,
                    ErrorKind::NotFound,
                );
            }
            Err(e) => {
                recommendations.push("Check store connectivity and retry".to_string());
                return fail(
                    format!("Country lookup failed: {e}"),
                    recommendations,
                    checks,
                    CheckStage::Country,
                    ErrorKind::Store,
                );
            }
        }

        // 3 + 4. package
        let row = match self.packages.fetch_package_row(country_id).await {
            Ok(row) => row,
            Err(e) => {
                recommendations.push("Check read permissions on the package table".to_string());
                return fail(
                    format!("Package lookup failed: {e}"),
                    recommendations,
                    checks,
                    CheckStage::PackageLookup,
                    ErrorKind::Store,
                );
            }
        };

        let message = match row {
            None => match self.packages.create_default_package(country_id).await {
                Ok(package) => {
                    checks.package = Some(PackageCheck {
                        exists: true,
                        is_active: package.is_active,
                        created_default: true,
                        issues: Vec::new(),
                        snapshot: Some(package),
                    });
                    recommendations.push(
                        "Set the government and service fees on the new default package".to_string(),
                    );
                    format!("No package found for {country_id}; created a default package")
                }
                Err(e) => {
                    recommendations
                        .push("Check write permissions on the package table".to_string());
                    return fail(
                        format!(
                            "No package found for {country_id} and creating a default failed: {e}"
                        ),
                        recommendations,
                        checks,
                        CheckStage::PackageLookup,
                        ErrorKind::Store,
                    );
                }
            },
            Some(row) => {
                let issues = PackageIssue::inspect(&row);
                let package = self.packages.normalize_row(&row);
                let passed = issues.is_empty();
                let summary = issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                checks.package = Some(PackageCheck {
                    exists: true,
                    is_active: package.is_active,
                    created_default: false,
                    issues,
                    snapshot: Some(package),
                });
                if !passed {
                    recommendations.push(format!(
                        "Edit the package and fill in the missing fields ({summary})"
                    ));
                    return fail(
                        format!("Package for {country_id} has issues: {summary}"),
                        recommendations,
                        checks,
                        CheckStage::PackageQuality,
                        ErrorKind::Validation,
                    );
                }
                format!("Package for {country_id} is configured correctly")
            }
        };

        // 5. documents
        if with_documents {
            self.check_documents(country_id, &mut checks, &mut recommendations)
                .await;
        }

        tracing::info!(country = %country_id, "diagnostic passed");
        DiagnosticResult::finish(true, message, recommendations, checks)
    }

    async fn check_table(&self, table: Table) -> TableCheck {
        match self.store.table_columns(table).await {
            Ok(columns) => TableCheck {
                table,
                accessible: true,
                missing_columns: table
                    .missing_columns(columns.as_slice())
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                error: None,
            },
            Err(e) => TableCheck {
                table,
                accessible: false,
                missing_columns: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    async fn check_documents(
        &self,
        country_id: &CountryId,
        checks: &mut DiagnosticChecks,
        recommendations: &mut Vec<String>,
    ) {
        let table = self.check_table(Table::Documents).await;
        if !table.passed() {
            recommendations.push(
                "Document checklist table needs attention; run the schema refresh".to_string(),
            );
        }
        checks.document_table = Some(table);

        let documents = match self.documents.try_fetch_documents(country_id).await {
            Ok(items) => DocumentCheck {
                accessible: true,
                exists: !items.is_empty(),
                count: items.len(),
                error: None,
            },
            Err(e) => {
                recommendations.push(
                    "Documents could not be read; check permissions on the document table"
                        .to_string(),
                );
                DocumentCheck {
                    accessible: false,
                    exists: false,
                    count: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        if documents.accessible && !documents.exists {
            recommendations.push(
                "No documents configured; activate the package to seed the default checklist"
                    .to_string(),
            );
        }
        checks.documents = Some(documents);
    }
}

fn fail(
    message: String,
    recommendations: Vec<String>,
    mut checks: DiagnosticChecks,
    stage: CheckStage,
    kind: ErrorKind,
) -> DiagnosticResult {
    tracing::warn!(?stage, ?kind, %message, "diagnostic failed");
    checks.failed_stage = Some(stage);
    let mut result = DiagnosticResult::finish(false, message, recommendations, checks);
    result.error_kind = Some(kind);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use visa_model::{default_document_set, RecordId};
    use visa_store::{InMemoryStore, StoreError, StoreOp};

    fn engine(store: &InMemoryStore) -> DiagnosticEngine {
        let shared: Arc<dyn ResourceStore> = Arc::new(store.clone());
        DiagnosticEngine::new(
            Arc::clone(&shared),
            PackageRepository::new(Arc::clone(&shared), 15),
            DocumentRepository::new(shared, default_document_set()),
        )
    }

    fn raw_row(country: &str, name: &str) -> PackageRow {
        PackageRow {
            id: RecordId::generate(),
            country_id: CountryId::new(country),
            name: Some(name.to_string()),
            government_fee: Some(json!(50)),
            service_fee: Some(json!(25)),
            processing_days: Some(json!(10)),
            processing_time: Some("10 days".into()),
            total_price: Some(json!(75)),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_total_column_stops_everything() {
        let store = InMemoryStore::new().with_countries(["jp"]);
        store.drop_column(Table::Packages, "total_price");

        let result = engine(&store).run_diagnostic(&CountryId::new("jp")).await;
        assert!(!result.success);
        assert!(result.message.contains("total_price"));
        assert_eq!(result.results.failed_stage, Some(CheckStage::PackageTable));
        assert_eq!(result.error_kind, Some(ErrorKind::Store));
        assert_eq!(store.calls(StoreOp::CountryExists), 0);
    }

    #[tokio::test]
    async fn unreachable_table_fails_structural_check() {
        let store = InMemoryStore::new().with_countries(["jp"]);
        store.set_unavailable(Table::Packages, true);

        let result = engine(&store).run_diagnostic(&CountryId::new("jp")).await;
        assert!(!result.success);
        assert!(!result.results.package_table.unwrap().accessible);
    }

    #[tokio::test]
    async fn unknown_country_fails() {
        let store = InMemoryStore::new();
        let result = engine(&store).run_diagnostic(&CountryId::new("zz")).await;
        assert!(!result.success);
        assert_eq!(result.results.country_exists, Some(false));
        assert_eq!(result.results.failed_stage, Some(CheckStage::Country));
        assert_eq!(result.error_kind, Some(ErrorKind::NotFound));
        assert_eq!(store.calls(StoreOp::SelectPackages), 0);
    }

    #[tokio::test]
    async fn country_lookup_fault_is_a_store_failure() {
        let store = InMemoryStore::new().with_countries(["zz"]);
        store.fail_next(StoreOp::CountryExists, StoreError::Connection("reset".into()));

        let result = engine(&store).run_diagnostic(&CountryId::new("zz")).await;
        assert!(!result.success);
        assert!(result.message.contains("Country lookup failed"));
        assert_eq!(result.results.failed_stage, Some(CheckStage::Country));
        assert_eq!(result.error_kind, Some(ErrorKind::Store));
        assert_eq!(store.calls(StoreOp::SelectPackages), 0);
    }

    #[tokio::test]
    async fn missing_package_gets_default() {
        let store = InMemoryStore::new().with_countries(["br"]);
        let country = CountryId::new("br");

        let result = engine(&store).run_diagnostic(&country).await;
        assert!(result.success);
        assert_eq!(result.error_kind, None);
        assert!(result.message.contains("created a default package"));

        let check = result.results.package.unwrap();
        assert!(check.created_default);
        let snapshot = check.snapshot.unwrap();
        assert_eq!(snapshot.government_fee, 0.0);
        assert_eq!(snapshot.service_fee, 0.0);
        assert_eq!(snapshot.processing_days, 15);
        assert_eq!(store.package_rows(&country).len(), 1);
    }

    #[tokio::test]
    async fn blank_name_is_an_issue() {
        let store = InMemoryStore::new().with_countries(["ca"]);
        store.seed_package_row(raw_row("ca", ""));

        let result = engine(&store).run_diagnostic(&CountryId::new("ca")).await;
        assert!(!result.success);
        assert!(result.message.contains("Missing package name"));
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        let check = result.results.package.unwrap();
        assert_eq!(check.issues, vec![PackageIssue::MissingName]);
        assert!(check.snapshot.is_some());
    }

    #[tokio::test]
    async fn missing_fees_and_days_are_issues() {
        let store = InMemoryStore::new().with_countries(["ca"]);
        let mut row = raw_row("ca", "Tourist");
        row.government_fee = None;
        row.service_fee = Some(serde_json::Value::Null);
        row.processing_days = None;
        store.seed_package_row(row);

        let result = engine(&store).run_diagnostic(&CountryId::new("ca")).await;
        assert_eq!(
            result.results.package.unwrap().issues,
            vec![
                PackageIssue::MissingGovernmentFee,
                PackageIssue::MissingServiceFee,
                PackageIssue::MissingProcessingDays
            ]
        );
    }

    #[tokio::test]
    async fn healthy_package_passes() {
        let store = InMemoryStore::new().with_countries(["ca"]);
        store.seed_package_row(raw_row("ca", "Tourist"));

        let result = engine(&store).run_diagnostic(&CountryId::new("ca")).await;
        assert!(result.success);
        assert!(result.results.documents.is_none());
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn document_checks_inform_but_never_fail() {
        let store = InMemoryStore::new().with_countries(["ca"]);
        store.seed_package_row(raw_row("ca", "Tourist"));
        store.set_unavailable(Table::Documents, true);

        let result = engine(&store).run_country_diagnostic(&CountryId::new("ca")).await;
        assert!(result.success);
        let docs = result.results.documents.unwrap();
        assert!(!docs.accessible);
        assert!(!result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn document_count_is_reported() {
        let store = InMemoryStore::new().with_countries(["ca"]);
        let country = CountryId::new("ca");
        store.seed_package_row(raw_row("ca", "Tourist"));
        store.seed_documents(&country, 4);

        let result = engine(&store).run_country_diagnostic(&country).await;
        let docs = result.results.documents.unwrap();
        assert!(docs.exists);
        assert_eq!(docs.count, 4);
        assert!(result.results.document_table.unwrap().passed());
    }

    #[tokio::test]
    async fn quality_failure_skips_document_checks() {
        let store = InMemoryStore::new().with_countries(["ca"]);
        store.seed_package_row(raw_row("ca", " "));

        let result = engine(&store).run_country_diagnostic(&CountryId::new("ca")).await;
        assert!(!result.success);
        assert!(result.results.documents.is_none());
        assert_eq!(store.calls(StoreOp::SelectDocuments), 0);
    }

    #[tokio::test]
    async fn failed_default_creation_is_reported() {
        let store = InMemoryStore::new().with_countries(["ng"]);
        store.fail_next(StoreOp::InsertPackage, StoreError::PermissionDenied("rls".into()));

        let result = engine(&store).run_diagnostic(&CountryId::new("ng")).await;
        assert!(!result.success);
        assert_eq!(result.results.failed_stage, Some(CheckStage::PackageLookup));
    }
}
