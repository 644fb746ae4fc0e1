//! Concurrent calls across countries

use futures::future::join_all;
use visa_model::{DocumentDraft, PackageDraft};
use visa_test_utils::{country, store_with_countries, TestHarness};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn toggles_for_different_countries_do_not_interfere() {
    let ids: Vec<String> = (0..8).map(|n| format!("K{n}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let h = TestHarness::new(store_with_countries(&refs));

    let results = join_all(ids.iter().map(|id| {
        let orchestrator = h.orchestrator.clone();
        let id = country(id);
        async move { orchestrator.toggle_package_and_ensure_documents(&id, true).await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    for id in &ids {
        let c = country(id);
        assert_eq!(h.store.package_rows(&c).len(), 1);
        assert_eq!(h.store.document_rows(&c).len(), 3);
        assert_eq!(h.invalidator.count_for(&c), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_saves_keep_price_invariant() {
    let h = TestHarness::new(store_with_countries(&["C1"]));

    let saves = join_all((1..=10).map(|n| {
        let orchestrator = h.orchestrator.clone();
        async move {
            orchestrator
                .save_country_configuration(
                    &PackageDraft::new(format!("P{n}")).with_fees(f64::from(n), 1.0),
                    &[DocumentDraft::new("Passport")],
                )
                .await
        }
    }))
    .await;

    for saved in saves {
        let saved = saved.unwrap();
        assert_eq!(
            saved.package.total_price,
            saved.package.government_fee + saved.package.service_fee
        );
        assert_eq!(saved.documents.len(), 1);
    }
}
