//! Job handler implementations.

pub mod report;

pub use report::ReportJobHandler;
