//! Employee report snapshot entities.

pub mod model;

pub use model::{EmployeeReportSnapshot, SnapshotStats};
