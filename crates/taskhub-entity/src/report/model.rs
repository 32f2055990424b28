//! Report entity model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use taskhub_core::types::{DateRange, ReportId, TenantId, UserId};

use super::outcome::BatchOutcome;
use super::status::{ReportScope, ReportStatus, ReportStatusKind, ReportType};

/// One report run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique report identifier.
    pub id: ReportId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Reporting period.
    pub report_type: ReportType,
    /// Users covered.
    pub scope: ReportScope,
    /// User who requested the report.
    pub requested_by: UserId,
    /// Explicit employees for EMPLOYEE scope.
    pub employee_ids: Vec<UserId>,
    /// First day covered.
    pub from_date: NaiveDate,
    /// Last day covered (inclusive).
    pub to_date: NaiveDate,
    /// Status discriminant.
    pub status: ReportStatusKind,
    /// Set exactly when `status` is FAILED.
    pub failure_reason: Option<String>,
    /// Summary PDF URL.
    pub pdf_url: Option<String>,
    /// Workbook URL.
    pub excel_url: Option<String>,
    /// Per-user results of the last run.
    pub outcome: Option<Json<BatchOutcome>>,
    /// Worker runs started for this report.
    pub attempts: i32,
    /// When the report was requested.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// When the report became READY.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Report {
    /// The tagged status.
    pub fn status(&self) -> ReportStatus {
        match self.status {
            ReportStatusKind::Generating => ReportStatus::Generating,
            ReportStatusKind::Ready => ReportStatus::Ready,
            ReportStatusKind::Failed => ReportStatus::Failed {
                reason: self
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "unknown failure".to_string()),
            },
        }
    }

    /// The covered date range.
    pub fn range(&self) -> DateRange {
        DateRange::unchecked(self.from_date, self.to_date)
    }

    /// Per-user results, empty when the worker has not stored any.
    pub fn outcome(&self) -> BatchOutcome {
        self.outcome
            .as_ref()
            .map(|json| json.0.clone())
            .unwrap_or_default()
    }
}

/// Data for creating a new report row.
#[derive(Debug, Clone)]
pub struct CreateReport {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Reporting period.
    pub report_type: ReportType,
    /// Users covered.
    pub scope: ReportScope,
    /// Requesting user.
    pub requested_by: UserId,
    /// Explicit employees for EMPLOYEE scope.
    pub employee_ids: Vec<UserId>,
    /// Covered range.
    pub range: DateRange,
}

impl CreateReport {
    /// Materialize a GENERATING report row.
    pub fn into_report(self, now: DateTime<Utc>) -> Report {
        Report {
            id: ReportId::new(),
            tenant_id: self.tenant_id,
            report_type: self.report_type,
            scope: self.scope,
            requested_by: self.requested_by,
            employee_ids: self.employee_ids,
            from_date: self.range.from_date,
            to_date: self.range.to_date,
            status: ReportStatusKind::Generating,
            failure_reason: None,
            pdf_url: None,
            excel_url: None,
            outcome: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// Visibility filter for listing reports.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    /// Tenant to list.
    pub tenant_id: TenantId,
    /// Restrict to reports requested by this user.
    pub requested_by: Option<UserId>,
    /// Restrict to one status.
    pub status: Option<ReportStatusKind>,
}

impl ReportFilter {
    /// Whether `report` passes the filter.
    pub fn matches(&self, report: &Report) -> bool {
        report.tenant_id == self.tenant_id
            && self.requested_by.is_none_or(|user| report.requested_by == user)
            && self.status.is_none_or(|status| report.status == status)
    }
}

/// Aggregate counts over a set of reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// All reports.
    pub total: u64,
    /// Reports still generating.
    pub generating: u64,
    /// Reports ready.
    pub ready: u64,
    /// Reports failed.
    pub failed: u64,
    /// Weekly reports.
    pub weekly: u64,
    /// Monthly reports.
    pub monthly: u64,
    /// Custom reports.
    pub custom: u64,
}

impl ReportSummary {
    /// Count `count` reports with the given status and type.
    pub fn add(&mut self, status: ReportStatusKind, report_type: ReportType, count: u64) {
        self.total += count;
        match status {
            ReportStatusKind::Generating => self.generating += count,
            ReportStatusKind::Ready => self.ready += count,
            ReportStatusKind::Failed => self.failed += count,
        }
        match report_type {
            ReportType::Weekly => self.weekly += count,
            ReportType::Monthly => self.monthly += count,
            ReportType::Custom => self.custom += count,
        }
    }
}
