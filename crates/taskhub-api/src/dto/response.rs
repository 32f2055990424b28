//! Response DTOs.

use serde::Serialize;

use taskhub_core::traits::queue::QueueStats;
use taskhub_core::types::ReportId;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Reply to a report request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportResponse {
    /// Id of the new report, also its job id.
    pub report_id: ReportId,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Database status.
    pub database: String,
    /// Queue status.
    pub queue: String,
    /// Job counts, when the queue answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<QueueStats>,
}
