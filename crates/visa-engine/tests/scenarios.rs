//! End-to-end scenarios through the orchestrator and façade

use pretty_assertions::assert_eq;
use visa_engine::{EngineConfig, EngineError, ErrorKind, OperationState};
use visa_model::{DocumentDraft, PackageDraft, RecordId, ValidationError};
use visa_store::{StoreOp, Table};
use visa_test_utils::{
    country, setup_harness, store_with_countries, StaticReconciler, TestHarness,
};

#[tokio::test]
async fn activating_country_without_package_seeds_everything() -> anyhow::Result<()> {
    visa_engine::init_test_tracing();
    let h = setup_harness();
    let c1 = country("C1");

    let outcome = h
        .orchestrator
        .toggle_package_and_ensure_documents(&c1, true)
        .await?;

    assert_eq!(h.store.package_rows(&c1).len(), 1);
    assert!(outcome.package.is_active);
    assert_eq!(outcome.package.total_price, 0.0);
    assert_eq!(outcome.package.processing_days, 15);
    assert_eq!(outcome.ensure.map(|r| r.created), Some(3));

    let names: Vec<String> = outcome.documents.iter().map(|d| d.name.clone()).collect();
    assert_eq!(names, vec!["Passport", "Photographs", "Travel Itinerary"]);
    assert!(outcome.refreshed_package.is_some());
    assert_eq!(h.invalidator.count_for(&c1), 1);
    Ok(())
}

#[tokio::test]
async fn saving_one_document_replaces_all_five() -> anyhow::Result<()> {
    let h = setup_harness();
    let c2 = country("C2");
    h.store.seed_documents(&c2, 5);

    let saved = h
        .orchestrator
        .save_documents(&c2, &[DocumentDraft::new("Passport").with_description("Valid 6 months")])
        .await?;

    assert_eq!(saved.len(), 1);
    let remaining = h.orchestrator.fetch_documents(&c2).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Passport");
    assert_eq!(remaining[0].description, "Valid 6 months");
    assert_eq!(h.invalidator.calls(), vec![c2]);
    Ok(())
}

#[tokio::test]
async fn ensure_default_documents_is_idempotent() -> anyhow::Result<()> {
    let h = setup_harness();
    let c1 = country("C1");
    let documents = h.orchestrator.documents();

    documents.ensure_default_documents(&c1).await?;
    assert_eq!(documents.fetch_documents(&c1).await.len(), 3);

    let again = documents.ensure_default_documents(&c1).await?;
    assert!(again.already_present);
    assert_eq!(documents.fetch_documents(&c1).await.len(), 3);
    Ok(())
}

#[tokio::test]
async fn empty_document_save_makes_no_store_mutation() {
    let h = setup_harness();
    let c1 = country("C1");

    let err = h.orchestrator.save_documents(&c1, &[]).await.unwrap_err();
    assert_eq!(err, EngineError::Validation(ValidationError::EmptyDocumentSet));
    assert_eq!(h.store.mutation_calls(), 0);
    assert!(h.invalidator.calls().is_empty());
}

#[tokio::test]
async fn toggled_package_reads_back_active() -> anyhow::Result<()> {
    let h = setup_harness();
    let c1 = country("C1");

    h.orchestrator
        .toggle_package_and_ensure_documents(&c1, false)
        .await?;
    let fetched = h.orchestrator.fetch_package(&c1).await?;
    assert!(fetched.is_some_and(|p| p.is_active));
    Ok(())
}

#[tokio::test]
async fn diagnostic_creates_exactly_one_default_package() {
    let h = setup_harness();
    let c1 = country("C1");

    let result = h.orchestrator.run_diagnostic(&c1).await;
    assert!(result.success);
    assert!(result.message.contains("default"));

    let rows = h.store.package_rows(&c1);
    assert_eq!(rows.len(), 1);
    let package = h.orchestrator.fetch_package(&c1).await.unwrap().unwrap();
    assert_eq!(package.government_fee, 0.0);
    assert_eq!(package.service_fee, 0.0);
    assert_eq!(package.processing_days, 15);

    let second = h.orchestrator.run_diagnostic(&c1).await;
    assert!(second.success);
    assert_eq!(h.store.package_rows(&c1).len(), 1);
}

#[tokio::test]
async fn blank_name_is_reported_as_missing() {
    let h = setup_harness();
    let c1 = country("C1");
    h.orchestrator
        .save_package(&PackageDraft::new("C1").with_name("   ").with_fees(10.0, 5.0))
        .await
        .unwrap();

    // saves fill in a default name, so add a newer blank row at the store level
    let mut row = h.store.package_rows(&c1).remove(0);
    row.id = RecordId::generate();
    row.name = Some(String::new());
    let blank = h.store.seed_package_row(row);

    let rows = h.store.package_rows(&c1);
    assert_eq!(rows.len(), 2);
    assert_ne!(rows[0].id, rows[1].id);
    let canonical = h.orchestrator.fetch_package(&c1).await.unwrap().unwrap();
    assert_eq!(canonical.id, Some(blank.id));

    let result = h.orchestrator.run_diagnostic(&c1).await;
    assert!(!result.success);
    assert!(result.message.contains("Missing package name"));
}

#[tokio::test]
async fn schema_gate_blocks_toggle_and_points_to_repair_tool() {
    let reconciler = StaticReconciler::failing("column total_price could not be added");
    let h = TestHarness::with_reconciler(
        store_with_countries(&["C1"]),
        reconciler.clone(),
        &EngineConfig::default().with_schema_repair_tool("Admin > Database Fix"),
    );

    let err = h
        .orchestrator
        .toggle_package_and_ensure_documents(&country("C1"), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaGate);
    let message = err.to_string();
    assert!(message.contains("column total_price could not be added"));
    assert!(message.contains("Admin > Database Fix"));
    assert_eq!(reconciler.calls(), 1);
    assert_eq!(h.store.mutation_calls(), 0);
    assert!(h.invalidator.calls().is_empty());
}

#[tokio::test]
async fn refresh_repairs_drift_before_diagnosing() {
    let store = store_with_countries(&["C1"]);
    store.drop_column(Table::Packages, "total_price");
    let h = TestHarness::new(store);
    let c1 = country("C1");

    let before = h.orchestrator.run_diagnostic(&c1).await;
    assert!(!before.success);
    assert_eq!(h.store.calls(StoreOp::CountryExists), 0);

    let after = h.orchestrator.refresh_schema_and_data(&c1).await;
    assert!(after.success, "{}", after.message);
    assert_eq!(after.schema_fixed, Some(true));
}

#[tokio::test]
async fn facade_tracks_toggle_state() {
    let h = setup_harness();
    let rx = h.facade.watch_toggle();
    assert_eq!(*rx.borrow(), OperationState::Idle);

    let outcome = h.facade.toggle_package(&country("C1"), true).await;
    assert!(outcome.success);
    assert_eq!(outcome.message, "Package activated for C1");
    assert!(rx.borrow().data().is_some_and(|t| t.documents.len() == 3));
}

#[tokio::test]
async fn facade_reports_partial_failure_kind() {
    let h = setup_harness();
    let c2 = country("C2");
    h.store.seed_documents(&c2, 2);
    h.store.fail_next(
        StoreOp::InsertDocuments,
        visa_store::StoreError::Connection("reset".into()),
    );

    let outcome = h
        .facade
        .save_documents(&c2, &[DocumentDraft::new("Passport")])
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::PartialFailure));
    assert!(outcome.message.contains("now has no documents"));
    assert!(h.store.document_rows(&c2).is_empty());
    assert_eq!(h.invalidator.count_for(&c2), 1);
}

#[tokio::test]
async fn reconciler_chain_falls_back_to_next_strategy() {
    let store = store_with_countries(&["C1"]);
    store.drop_column(Table::Packages, "total_price");
    let rpc = StaticReconciler::failing("function fix_visa_schema does not exist");
    let chain = visa_engine::ReconcilerChain::new()
        .then(rpc.clone())
        .then(std::sync::Arc::new(store.reconciler()));
    let h = TestHarness::with_reconciler(
        store,
        std::sync::Arc::new(chain),
        &EngineConfig::default(),
    );

    let outcome = h
        .orchestrator
        .toggle_package_and_ensure_documents(&country("C1"), true)
        .await;
    assert!(outcome.is_ok());
    assert_eq!(rpc.calls(), 1);
    assert!(h.store.package_rows(&country("C1"))[0].total_price.is_some());
}

#[tokio::test]
async fn schema_repair_survives_a_failed_toggle() {
    let store = store_with_countries(&["C1"]);
    store.drop_column(Table::Packages, "total_price");
    let h = TestHarness::new(store);
    let c1 = country("C1");
    h.store.fail_next(
        StoreOp::SelectPackages,
        visa_store::StoreError::Connection("down".into()),
    );

    let err = h
        .orchestrator
        .toggle_package_and_ensure_documents(&c1, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert!(h.store.package_rows(&c1).is_empty());
    assert!(h.invalidator.calls().is_empty());

    // the column added by the schema gate stays in place
    let result = h.orchestrator.run_diagnostic(&c1).await;
    assert!(result.success, "{}", result.message);
    assert!(result.results.package_table.is_some_and(|t| t.passed()));
}

#[tokio::test]
async fn facade_reports_unknown_country_as_not_found() {
    let h = setup_harness();

    let outcome = h.facade.run_diagnostic(&country("C9")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::NotFound));
    assert!(outcome.data.is_some_and(|r| r.error_kind == Some(ErrorKind::NotFound)));
}
