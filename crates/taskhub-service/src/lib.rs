//! # taskhub-service
//!
//! Report use cases for TaskHub. [`ReportService`] backs the HTTP layer;
//! [`ReportAggregator`] and [`resolve_scope`] are shared with the worker.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod report;

pub use context::RequestContext;
pub use report::{
    ReportAggregator, ReportDetail, ReportRequest, ReportService, UserAggregate, compute_stats,
    resolve_scope,
};
