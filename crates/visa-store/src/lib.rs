//! Visa Store - resource store and schema reconciler contracts
//!
//! The engine depends only on the traits defined here:
//! - [`ResourceStore`]: reads and writes package and document rows
//! - [`SchemaReconciler`]: store-wide structural repair
//!
//! [`InMemoryStore`] implements both sides for tests and local runs.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use error::StoreError;
pub use memory::{InMemoryStore, MemoryReconciler, StoreOp};
pub use schema::{SchemaReconciler, SchemaReport};
pub use store::ResourceStore;
pub use table::Table;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
