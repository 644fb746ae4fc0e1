//! Testing utilities for the visa configuration workspace
//!
//! Shared fakes and fixtures for integration tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use visa_engine::{CacheInvalidator, EngineConfig, RepairOrchestrator, StateFacade};
use visa_model::CountryId;
use visa_store::{InMemoryStore, SchemaReconciler, SchemaReport};

/// Invalidator that records every country it was asked to invalidate
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<CountryId>>,
}

impl RecordingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<CountryId> {
        self.calls.lock().clone()
    }

    pub fn count_for(&self, country_id: &CountryId) -> usize {
        self.calls.lock().iter().filter(|c| *c == country_id).count()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, country_id: &CountryId) {
        self.calls.lock().push(country_id.clone());
    }
}

/// Reconciler with a fixed answer
#[derive(Debug)]
pub struct StaticReconciler {
    report: SchemaReport,
    calls: AtomicUsize,
}

impl StaticReconciler {
    pub fn ok() -> Arc<Self> {
        Self::with_report(SchemaReport::ok("Schema is up to date"))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_report(SchemaReport::failed(message))
    }

    fn with_report(report: SchemaReport) -> Arc<Self> {
        Arc::new(Self {
            report,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaReconciler for StaticReconciler {
    async fn fix_schema(&self) -> SchemaReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.report.clone()
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Store, fakes and wired engine for one test
#[derive(Debug, Clone)]
pub struct TestHarness {
    pub store: InMemoryStore,
    pub invalidator: Arc<RecordingInvalidator>,
    pub orchestrator: Arc<RepairOrchestrator>,
    pub facade: StateFacade,
}

impl TestHarness {
    /// Engine over `store`, repairing schema with the store's own reconciler
    pub fn new(store: InMemoryStore) -> Self {
        let reconciler = Arc::new(store.reconciler());
        Self::with_reconciler(store, reconciler, &EngineConfig::default())
    }

    pub fn with_reconciler(
        store: InMemoryStore,
        reconciler: Arc<dyn SchemaReconciler>,
        config: &EngineConfig,
    ) -> Self {
        let invalidator = RecordingInvalidator::new();
        let orchestrator = Arc::new(RepairOrchestrator::new(
            Arc::new(store.clone()),
            reconciler,
            invalidator.clone(),
            config,
        ));
        let facade = StateFacade::new(Arc::clone(&orchestrator));
        Self {
            store,
            invalidator,
            orchestrator,
            facade,
        }
    }
}

/// Store knowing the given countries
pub fn store_with_countries(countries: &[&str]) -> InMemoryStore {
    InMemoryStore::new().with_countries(countries.iter().copied())
}

/// Harness over a store knowing `C1` and `C2`
pub fn setup_harness() -> TestHarness {
    TestHarness::new(store_with_countries(&["C1", "C2"]))
}

pub fn country(id: &str) -> CountryId {
    CountryId::new(id)
}
