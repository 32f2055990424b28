//! Report generation use cases.

pub mod aggregator;
pub mod scope;
pub mod service;

pub use aggregator::{ReportAggregator, UserAggregate, compute_stats};
pub use scope::resolve_scope;
pub use service::{ReportDetail, ReportRequest, ReportService};
