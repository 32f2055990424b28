//! Payload of the `generate-report` job.

use serde::{Deserialize, Serialize};

use taskhub_core::types::{ReportId, UserId};

use crate::report::ReportScope;

/// Job name on the report queue.
pub const GENERATE_REPORT_JOB: &str = "generate-report";

/// Payload of a report job.
///
/// Accepts both the plain `{"reportId"}` form and the richer form carrying
/// `scope` and `employeeIds`; absent fields fall back to the report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    /// Report to generate; also the job id.
    pub report_id: ReportId,
    /// Scope override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ReportScope>,
    /// Employee list override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_ids: Option<Vec<UserId>>,
}

impl ReportJob {
    /// Plain payload for a report.
    pub fn new(report_id: ReportId) -> Self {
        Self {
            report_id,
            scope: None,
            employee_ids: None,
        }
    }

    /// Queue job id.
    pub fn job_id(&self) -> String {
        self.report_id.to_string()
    }
}
