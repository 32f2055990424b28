//! Queue job payloads.

pub mod payload;

pub use payload::{GENERATE_REPORT_JOB, ReportJob};
