//! Schema reconciler contract
//!
//! Detects and repairs structural drift (missing columns, missing generated
//! fields) store-wide. The engine treats it as a black-box precondition gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome reported by a reconciler run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Whether the schema is now usable
    pub success: bool,
    /// Human-readable summary
    pub message: String,
}

impl SchemaReport {
    /// Successful run
    #[inline]
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed run
    #[inline]
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Store-wide schema repair
#[async_trait]
pub trait SchemaReconciler: Send + Sync + std::fmt::Debug {
    /// Detect and repair drift. Must be idempotent.
    async fn fix_schema(&self) -> SchemaReport;

    /// Name used in logs
    fn name(&self) -> &str {
        "schema-reconciler"
    }
}
