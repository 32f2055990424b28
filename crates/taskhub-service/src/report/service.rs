//! Report request, listing and retry service.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::queue::{EnqueueOutcome, JobQueue, NewJob};
use taskhub_core::types::pagination::{PageRequest, PageResponse};
use taskhub_core::types::{DateRange, ReportId, UserId};
use taskhub_database::ReportStore;
use taskhub_entity::job::{GENERATE_REPORT_JOB, ReportJob};
use taskhub_entity::report::{
    CreateReport, Report, ReportFilter, ReportScope, ReportStatusKind, ReportSummary, ReportType,
};
use taskhub_entity::snapshot::EmployeeReportSnapshot;

use crate::context::RequestContext;

/// Input of a report request.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Reporting period.
    pub report_type: ReportType,
    /// First day covered.
    pub from_date: NaiveDate,
    /// Last day covered (inclusive).
    pub to_date: NaiveDate,
    /// Users covered.
    pub scope: ReportScope,
    /// Explicit employees for EMPLOYEE scope.
    pub employee_ids: Vec<UserId>,
}

/// A report with its per-user snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetail {
    /// The report row.
    #[serde(flatten)]
    pub report: Report,
    /// One snapshot per covered user.
    pub snapshots: Vec<EmployeeReportSnapshot>,
}

/// Creates reports, hands them to the worker and answers queries.
#[derive(Debug, Clone)]
pub struct ReportService {
    /// Persistence.
    store: Arc<dyn ReportStore>,
    /// Report generation queue.
    queue: Arc<dyn JobQueue>,
    /// Delivery attempts per job.
    max_attempts: u32,
}

impl ReportService {
    /// Creates a new report service.
    pub fn new(store: Arc<dyn ReportStore>, queue: Arc<dyn JobQueue>, max_attempts: u32) -> Self {
        Self {
            store,
            queue,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create a GENERATING report and enqueue its job.
    pub async fn request(&self, ctx: &RequestContext, req: ReportRequest) -> AppResult<Report> {
        let range = DateRange::new(req.from_date, req.to_date)?;

        if req.scope == ReportScope::Team && !ctx.role.can_request_team_reports() {
            return Err(AppError::authorization(format!(
                "Role {} cannot request TEAM reports",
                ctx.role
            )));
        }

        let report = self
            .store
            .create_report(CreateReport {
                tenant_id: ctx.tenant_id,
                report_type: req.report_type,
                scope: req.scope,
                requested_by: ctx.user_id,
                employee_ids: req.employee_ids,
                range,
            })
            .await?;

        if let Err(e) = self.enqueue(&report).await {
            warn!(report_id = %report.id, error = %e, "Failed to enqueue report job");
            self.store
                .mark_failed(report.id, &format!("Failed to enqueue report job: {e}"), None)
                .await?;
            return Err(e);
        }

        info!(
            report_id = %report.id,
            tenant_id = %report.tenant_id,
            requested_by = %report.requested_by,
            scope = %report.scope,
            report_type = %report.report_type,
            "Report requested"
        );
        Ok(report)
    }

    /// Page through the reports visible to the caller.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        status: Option<ReportStatusKind>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Report>> {
        let filter = ReportFilter {
            status,
            ..ctx.report_filter()
        };
        self.store.list_reports(&filter, page).await
    }

    /// Counts over the reports visible to the caller.
    pub async fn summary(&self, ctx: &RequestContext) -> AppResult<ReportSummary> {
        self.store.summarize_reports(&ctx.report_filter()).await
    }

    /// A visible report with its snapshots.
    pub async fn detail(&self, ctx: &RequestContext, id: ReportId) -> AppResult<ReportDetail> {
        let report = self.find_visible(ctx, id).await?;
        let snapshots = self.store.list_snapshots(report.id).await?;
        Ok(ReportDetail { report, snapshots })
    }

    /// Move a FAILED report back to GENERATING and enqueue it again.
    pub async fn retry(&self, ctx: &RequestContext, id: ReportId) -> AppResult<Report> {
        let report = self.find_visible(ctx, id).await?;
        let report = self.store.reset_failed(report.id).await?.ok_or_else(|| {
            AppError::conflict(format!(
                "Report {id} is {}; only FAILED reports can be retried",
                report.status
            ))
        })?;

        if let Err(e) = self.enqueue(&report).await {
            self.store
                .mark_failed(report.id, &format!("Failed to enqueue report job: {e}"), None)
                .await?;
            return Err(e);
        }

        info!(report_id = %report.id, "Report retry enqueued");
        Ok(report)
    }

    /// Enqueue the job of an existing report, outside any request context.
    ///
    /// A FAILED report is reset first; a READY report is rejected.
    pub async fn requeue(&self, id: ReportId) -> AppResult<EnqueueOutcome> {
        let report = self
            .store
            .find_report(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Report {id} not found")))?;

        let report = match report.status {
            ReportStatusKind::Ready => {
                return Err(AppError::conflict(format!("Report {id} is already READY")));
            }
            ReportStatusKind::Failed => self.store.reset_failed(id).await?.unwrap_or(report),
            ReportStatusKind::Generating => report,
        };

        let outcome = self.enqueue(&report).await?;
        info!(report_id = %id, outcome = ?outcome, "Report job re-enqueued");
        Ok(outcome)
    }

    async fn find_visible(&self, ctx: &RequestContext, id: ReportId) -> AppResult<Report> {
        self.store
            .find_report(id)
            .await?
            .filter(|report| ctx.report_filter().matches(report))
            .ok_or_else(|| AppError::not_found(format!("Report {id} not found")))
    }

    async fn enqueue(&self, report: &Report) -> AppResult<EnqueueOutcome> {
        let job = ReportJob {
            report_id: report.id,
            scope: Some(report.scope),
            employee_ids: Some(report.employee_ids.clone()),
        };
        let outcome = self
            .queue
            .enqueue(NewJob {
                id: job.job_id(),
                name: GENERATE_REPORT_JOB.to_string(),
                payload: serde_json::to_value(&job)?,
                max_attempts: self.max_attempts,
            })
            .await?;
        Ok(outcome)
    }
}
