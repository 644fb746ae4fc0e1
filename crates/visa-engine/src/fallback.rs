//! Ordered fallback over schema reconcilers
//!
//! Strategies run in sequence; the first success short-circuits. A failing
//! strategy is logged and the next one is tried. Only when every strategy has
//! failed does the chain report failure, with all messages attached.

use async_trait::async_trait;
use std::sync::Arc;
use visa_store::{SchemaReconciler, SchemaReport};

/// Reconciler that tries several reconcilers in order
#[derive(Debug, Clone, Default)]
pub struct ReconcilerChain {
    strategies: Vec<Arc<dyn SchemaReconciler>>,
}

impl ReconcilerChain {
    /// Empty chain; fails until a strategy is added
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy
    #[inline]
    #[must_use]
    pub fn then(mut self, strategy: Arc<dyn SchemaReconciler>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Number of strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True when no strategy is configured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl SchemaReconciler for ReconcilerChain {
    async fn fix_schema(&self) -> SchemaReport {
        if self.strategies.is_empty() {
            return SchemaReport::failed("no schema reconciler configured");
        }

        let mut failures = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let report = strategy.fix_schema().await;
            if report.success {
                tracing::debug!(strategy = strategy.name(), "schema reconciler succeeded");
                return report;
            }
            tracing::warn!(
                strategy = strategy.name(),
                message = %report.message,
                "schema reconciler failed, trying next"
            );
            failures.push(format!("{}: {}", strategy.name(), report.message));
        }

        SchemaReport::failed(failures.join("; "))
    }

    fn name(&self) -> &str {
        "chain"
    }
}
