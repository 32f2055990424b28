//! # taskhub-database
//!
//! PostgreSQL connection management, concrete repositories for the report
//! pipeline entities, and the [`ReportStore`] seam used by the worker and
//! the HTTP layer. The `memory` feature adds an in-process store.

pub mod connection;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryReportStore;
pub use store::{PgReportStore, ReportArtifacts, ReportStore};
