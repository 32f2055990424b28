//! Request DTOs with validation.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use taskhub_core::types::UserId;
use taskhub_core::types::pagination::PageRequest;
use taskhub_entity::report::{ReportScope, ReportStatusKind, ReportType};
use taskhub_service::ReportRequest;

/// Body of `POST /api/reports/generate`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    /// Reporting period.
    #[serde(rename = "type")]
    pub report_type: ReportType,
    /// First day covered.
    pub from_date: NaiveDate,
    /// Last day covered (inclusive).
    pub to_date: NaiveDate,
    /// Users covered; defaults to EMPLOYEE.
    #[serde(default)]
    pub scope: Option<ReportScope>,
    /// Explicit employees for EMPLOYEE scope.
    #[serde(default)]
    #[validate(length(max = 500, message = "Too many employees"))]
    pub employee_ids: Vec<UserId>,
}

impl From<GenerateReportRequest> for ReportRequest {
    fn from(body: GenerateReportRequest) -> Self {
        Self {
            report_type: body.report_type,
            from_date: body.from_date,
            to_date: body.to_date,
            scope: body.scope.unwrap_or(ReportScope::Employee),
            employee_ids: body.employee_ids,
        }
    }
}

/// Query of `GET /api/reports`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListReportsQuery {
    /// Page number (1-based, default: 1).
    pub page: Option<u64>,
    /// Items per page (default: 20, max: 100).
    pub page_size: Option<u64>,
    /// Only reports in this state.
    pub status: Option<ReportStatusKind>,
}

impl ListReportsQuery {
    /// Converts to a `PageRequest`.
    pub fn page_request(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(default.page),
            self.page_size.unwrap_or(default.page_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_body_defaults_to_employee_scope() {
        let body: GenerateReportRequest = serde_json::from_value(serde_json::json!({
            "type": "WEEKLY",
            "fromDate": "2024-01-01",
            "toDate": "2024-01-07"
        }))
        .expect("deserialize");
        assert!(body.validate().is_ok());

        let request = ReportRequest::from(body);
        assert_eq!(request.scope, ReportScope::Employee);
        assert!(request.employee_ids.is_empty());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let query = ListReportsQuery {
            page: Some(0),
            page_size: Some(1000),
            status: None,
        };
        let page = query.page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 100);
        assert_eq!(ListReportsQuery::default().page_request().page_size, 20);
    }
}
