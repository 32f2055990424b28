//! Report generation worker for TaskHub.
//!
//! This crate provides:
//! - A worker runner that reserves jobs from the report queue, keeps their
//!   leases alive and records the outcome
//! - A job executor that dispatches deliveries to the registered handler
//! - The `generate-report` job handler
//! - The failure notifier: alert emails for failed jobs, lost leases,
//!   queue connection outages and process-level failures

pub mod alerts;
pub mod executor;
pub mod jobs;
pub mod runner;

pub use alerts::{ConnectionSupervisor, FailureNotifier};
pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use jobs::ReportJobHandler;
pub use runner::WorkerRunner;
