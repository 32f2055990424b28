//! Report repository implementation.

use sqlx::PgPool;
use sqlx::types::Json;

use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::types::ReportId;
use taskhub_core::types::pagination::{PageRequest, PageResponse};
use taskhub_entity::report::{
    BatchOutcome, Report, ReportFilter, ReportStatusKind, ReportSummary, ReportType,
};

/// Map an insert failure. `requested_by` is the only foreign key of a
/// report row, so a violation means the requesting user does not exist.
fn create_error(e: sqlx::Error) -> AppError {
    let unknown_user = e
        .as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation());
    if unknown_user {
        AppError::with_source(ErrorKind::NotFound, "Requesting user not found", e)
    } else {
        AppError::with_source(ErrorKind::Database, "Failed to create report", e)
    }
}

/// Repository for report rows.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a new report repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a report row.
    pub async fn create(&self, report: &Report) -> AppResult<Report> {
        sqlx::query_as::<_, Report>(
            "INSERT INTO reports (id, tenant_id, report_type, scope, requested_by, employee_ids, \
             from_date, to_date, status, attempts, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(report.id)
        .bind(report.tenant_id)
        .bind(report.report_type)
        .bind(report.scope)
        .bind(report.requested_by)
        .bind(&report.employee_ids)
        .bind(report.from_date)
        .bind(report.to_date)
        .bind(report.status)
        .bind(report.attempts)
        .bind(report.created_at)
        .bind(report.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(create_error)
    }

    /// Find a report by id.
    pub async fn find_by_id(&self, id: ReportId) -> AppResult<Option<Report>> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find report", e))
    }

    /// List reports visible under `filter`, newest first.
    pub async fn find_filtered(
        &self,
        filter: &ReportFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Report>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE tenant_id = $1 \
             AND ($2::uuid IS NULL OR requested_by = $2) \
             AND ($3::report_status IS NULL OR status = $3)",
        )
        .bind(filter.tenant_id)
        .bind(filter.requested_by)
        .bind(filter.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count reports", e))?;

        let items = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE tenant_id = $1 \
             AND ($2::uuid IS NULL OR requested_by = $2) \
             AND ($3::report_status IS NULL OR status = $3) \
             ORDER BY created_at DESC LIMIT $4 OFFSET $5",
        )
        .bind(filter.tenant_id)
        .bind(filter.requested_by)
        .bind(filter.status)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list reports", e))?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    /// Count reports visible under `filter` by status and type.
    pub async fn summarize(&self, filter: &ReportFilter) -> AppResult<ReportSummary> {
        let rows: Vec<(ReportStatusKind, ReportType, i64)> = sqlx::query_as(
            "SELECT status, report_type, COUNT(*) FROM reports WHERE tenant_id = $1 \
             AND ($2::uuid IS NULL OR requested_by = $2) \
             GROUP BY status, report_type",
        )
        .bind(filter.tenant_id)
        .bind(filter.requested_by)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to summarize reports", e))?;

        let mut summary = ReportSummary::default();
        for (status, report_type, count) in rows {
            summary.add(status, report_type, count as u64);
        }
        Ok(summary)
    }

    /// Start a worker run: status GENERATING, attempts incremented.
    ///
    /// Returns `None` when the report does not exist or is already READY.
    pub async fn begin_attempt(&self, id: ReportId) -> AppResult<Option<Report>> {
        sqlx::query_as::<_, Report>(
            "UPDATE reports SET status = 'generating', failure_reason = NULL, \
             attempts = attempts + 1, updated_at = NOW() \
             WHERE id = $1 AND status <> 'ready' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to start report run", e))
    }

    /// Mark a report READY with its artifact URLs and outcome.
    pub async fn mark_ready(
        &self,
        id: ReportId,
        pdf_url: Option<&str>,
        excel_url: Option<&str>,
        outcome: &BatchOutcome,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE reports SET status = 'ready', failure_reason = NULL, pdf_url = $2, \
             excel_url = $3, outcome = $4, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(pdf_url)
        .bind(excel_url)
        .bind(Json(outcome))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark report ready", e))?;
        Ok(())
    }

    /// Mark a report FAILED. A READY report is left untouched.
    pub async fn mark_failed(
        &self,
        id: ReportId,
        reason: &str,
        outcome: Option<&BatchOutcome>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE reports SET status = 'failed', failure_reason = $2, \
             outcome = COALESCE($3, outcome), updated_at = NOW() \
             WHERE id = $1 AND status <> 'ready'",
        )
        .bind(id)
        .bind(reason)
        .bind(outcome.map(Json))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark report failed", e))?;
        Ok(())
    }

    /// Move a FAILED report back to GENERATING.
    ///
    /// Returns `None` when the report is not FAILED.
    pub async fn reset_failed(&self, id: ReportId) -> AppResult<Option<Report>> {
        sqlx::query_as::<_, Report>(
            "UPDATE reports SET status = 'generating', failure_reason = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'failed' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reset report", e))
    }
}
