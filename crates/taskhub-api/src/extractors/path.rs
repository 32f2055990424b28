//! Typed path parameter helpers.

use taskhub_core::error::AppError;
use taskhub_core::types::ReportId;

/// Parses a report id from a path segment.
pub fn parse_report_id(s: &str) -> Result<ReportId, AppError> {
    s.parse()
        .map_err(|_| AppError::validation(format!("Invalid report id: {s}")))
}
