//! Report run entities.

pub mod model;
pub mod outcome;
pub mod status;

pub use model::{CreateReport, Report, ReportFilter, ReportSummary};
pub use outcome::{BatchOutcome, UserFailure};
pub use status::{ReportScope, ReportStatus, ReportStatusKind, ReportType};
