//! Employee report snapshot repository.

use sqlx::PgPool;

use taskhub_core::config::SnapshotPolicy;
use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::types::{ReportId, UserId};
use taskhub_entity::snapshot::EmployeeReportSnapshot;

const INSERT_COLUMNS: &str = "INSERT INTO employee_report_snapshots (id, report_id, tenant_id, \
    user_id, total_tasks, completed_tasks, todo_tasks, working_tasks, total_minutes, total_hours, \
    avg_daily_hours, completion_rate, productivity_score, pdf_url, from_date, to_date, \
    created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)";

const ON_CONFLICT_REFRESH: &str = " ON CONFLICT (report_id, user_id) DO UPDATE SET \
    total_tasks = EXCLUDED.total_tasks, completed_tasks = EXCLUDED.completed_tasks, \
    todo_tasks = EXCLUDED.todo_tasks, working_tasks = EXCLUDED.working_tasks, \
    total_minutes = EXCLUDED.total_minutes, total_hours = EXCLUDED.total_hours, \
    avg_daily_hours = EXCLUDED.avg_daily_hours, completion_rate = EXCLUDED.completion_rate, \
    productivity_score = EXCLUDED.productivity_score, \
    pdf_url = COALESCE(EXCLUDED.pdf_url, employee_report_snapshots.pdf_url), \
    updated_at = EXCLUDED.updated_at \
    RETURNING *";

const ON_CONFLICT_KEEP: &str = " ON CONFLICT (report_id, user_id) DO NOTHING RETURNING *";

/// Repository for snapshot rows.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    /// Create a new snapshot repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update the row for `(report_id, user_id)` following `policy`.
    ///
    /// Returns the row as stored after the statement.
    pub async fn upsert(
        &self,
        snapshot: &EmployeeReportSnapshot,
        policy: SnapshotPolicy,
    ) -> AppResult<EmployeeReportSnapshot> {
        let sql = match policy {
            SnapshotPolicy::Refresh => format!("{INSERT_COLUMNS}{ON_CONFLICT_REFRESH}"),
            SnapshotPolicy::KeepFirst => format!("{INSERT_COLUMNS}{ON_CONFLICT_KEEP}"),
        };

        let written = sqlx::query_as::<_, EmployeeReportSnapshot>(&sql)
            .bind(snapshot.id)
            .bind(snapshot.report_id)
            .bind(snapshot.tenant_id)
            .bind(snapshot.user_id)
            .bind(snapshot.total_tasks)
            .bind(snapshot.completed_tasks)
            .bind(snapshot.todo_tasks)
            .bind(snapshot.working_tasks)
            .bind(snapshot.total_minutes)
            .bind(snapshot.total_hours)
            .bind(snapshot.avg_daily_hours)
            .bind(snapshot.completion_rate)
            .bind(snapshot.productivity_score)
            .bind(&snapshot.pdf_url)
            .bind(snapshot.from_date)
            .bind(snapshot.to_date)
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert snapshot", e))?;

        match written {
            Some(row) => Ok(row),
            None => self
                .find(snapshot.report_id, snapshot.user_id)
                .await?
                .ok_or_else(|| AppError::database("Snapshot vanished after conflicting insert")),
        }
    }

    /// Find the row for `(report_id, user_id)`.
    pub async fn find(
        &self,
        report_id: ReportId,
        user_id: UserId,
    ) -> AppResult<Option<EmployeeReportSnapshot>> {
        sqlx::query_as::<_, EmployeeReportSnapshot>(
            "SELECT * FROM employee_report_snapshots WHERE report_id = $1 AND user_id = $2",
        )
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find snapshot", e))
    }

    /// Store the PDF URL of a snapshot.
    pub async fn set_pdf_url(&self, report_id: ReportId, user_id: UserId, url: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE employee_report_snapshots SET pdf_url = $3, updated_at = NOW() \
             WHERE report_id = $1 AND user_id = $2",
        )
        .bind(report_id)
        .bind(user_id)
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to store snapshot PDF", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "No snapshot for report {report_id} and user {user_id}"
            )));
        }
        Ok(())
    }

    /// All snapshots of a report.
    pub async fn find_by_report(&self, report_id: ReportId) -> AppResult<Vec<EmployeeReportSnapshot>> {
        sqlx::query_as::<_, EmployeeReportSnapshot>(
            "SELECT * FROM employee_report_snapshots WHERE report_id = $1 ORDER BY created_at, user_id",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list snapshots", e))
    }
}
