//! The persistence seam of the report pipeline.

use async_trait::async_trait;

use taskhub_core::config::SnapshotPolicy;
use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::types::pagination::{PageRequest, PageResponse};
use taskhub_core::types::{DateRange, ReportId, TenantId, UserId};
use taskhub_entity::report::{BatchOutcome, CreateReport, Report, ReportFilter, ReportSummary};
use taskhub_entity::snapshot::EmployeeReportSnapshot;
use taskhub_entity::task::{Task, TaskWorkLog};
use taskhub_entity::user::{User, UserRole};

use crate::connection::DatabasePool;
use crate::repositories::{
    ActivityRepository, ReportRepository, SnapshotRepository, UserRepository,
};

/// Report-level artifact URLs stored when a report becomes READY.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportArtifacts {
    /// Team summary PDF.
    pub pdf_url: Option<String>,
    /// Metrics workbook.
    pub excel_url: Option<String>,
}

/// Everything the pipeline reads and writes.
#[async_trait]
pub trait ReportStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new GENERATING report.
    async fn create_report(&self, input: CreateReport) -> AppResult<Report>;

    /// Find a report by id.
    async fn find_report(&self, id: ReportId) -> AppResult<Option<Report>>;

    /// Page through reports matching `filter`, newest first.
    async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Report>>;

    /// Count reports matching `filter` by status and type.
    async fn summarize_reports(&self, filter: &ReportFilter) -> AppResult<ReportSummary>;

    /// Start a worker run. `None` when the report is missing or READY.
    async fn begin_attempt(&self, id: ReportId) -> AppResult<Option<Report>>;

    /// Finish a run successfully.
    async fn mark_ready(
        &self,
        id: ReportId,
        artifacts: ReportArtifacts,
        outcome: &BatchOutcome,
    ) -> AppResult<()>;

    /// Finish a run with a failure reason. READY reports are not touched.
    async fn mark_failed(
        &self,
        id: ReportId,
        reason: &str,
        outcome: Option<&BatchOutcome>,
    ) -> AppResult<()>;

    /// Move a FAILED report back to GENERATING. `None` when not FAILED.
    async fn reset_failed(&self, id: ReportId) -> AppResult<Option<Report>>;

    /// Find a user by id.
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>>;

    /// Users of `tenant_id` among `ids`; unknown ids are omitted.
    async fn find_users(&self, tenant_id: TenantId, ids: &[UserId]) -> AppResult<Vec<User>>;

    /// Active users of the tenant with one of `roles`, optionally only the
    /// direct reports of `manager_id`.
    async fn list_team_members(
        &self,
        tenant_id: TenantId,
        roles: &[UserRole],
        manager_id: Option<UserId>,
    ) -> AppResult<Vec<User>>;

    /// Tasks assigned to the user and created inside the window.
    async fn tasks_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<Task>>;

    /// Closed work logs of the user inside the window.
    async fn closed_work_logs(&self, user_id: UserId, range: &DateRange)
    -> AppResult<Vec<TaskWorkLog>>;

    /// Write the snapshot for `(report_id, user_id)` following `policy`.
    async fn upsert_snapshot(
        &self,
        snapshot: EmployeeReportSnapshot,
        policy: SnapshotPolicy,
    ) -> AppResult<EmployeeReportSnapshot>;

    /// Store the PDF URL of a snapshot.
    async fn set_snapshot_pdf(&self, report_id: ReportId, user_id: UserId, url: &str)
    -> AppResult<()>;

    /// All snapshots of a report.
    async fn list_snapshots(&self, report_id: ReportId) -> AppResult<Vec<EmployeeReportSnapshot>>;

    /// Probe the backing database.
    async fn health_check(&self) -> AppResult<()>;
}

/// [`ReportStore`] over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgReportStore {
    db: DatabasePool,
    reports: ReportRepository,
    snapshots: SnapshotRepository,
    users: UserRepository,
    activity: ActivityRepository,
}

impl PgReportStore {
    /// Build the store and its repositories over one pool.
    pub fn new(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            reports: ReportRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            activity: ActivityRepository::new(pool),
            db,
        }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn create_report(&self, input: CreateReport) -> AppResult<Report> {
        let report = input.into_report(chrono::Utc::now());
        self.reports.create(&report).await
    }

    async fn find_report(&self, id: ReportId) -> AppResult<Option<Report>> {
        self.reports.find_by_id(id).await
    }

    async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Report>> {
        self.reports.find_filtered(filter, page).await
    }

    async fn summarize_reports(&self, filter: &ReportFilter) -> AppResult<ReportSummary> {
        self.reports.summarize(filter).await
    }

    async fn begin_attempt(&self, id: ReportId) -> AppResult<Option<Report>> {
        self.reports.begin_attempt(id).await
    }

    async fn mark_ready(
        &self,
        id: ReportId,
        artifacts: ReportArtifacts,
        outcome: &BatchOutcome,
    ) -> AppResult<()> {
        self.reports
            .mark_ready(
                id,
                artifacts.pdf_url.as_deref(),
                artifacts.excel_url.as_deref(),
                outcome,
            )
            .await
    }

    async fn mark_failed(
        &self,
        id: ReportId,
        reason: &str,
        outcome: Option<&BatchOutcome>,
    ) -> AppResult<()> {
        self.reports.mark_failed(id, reason, outcome).await
    }

    async fn reset_failed(&self, id: ReportId) -> AppResult<Option<Report>> {
        self.reports.reset_failed(id).await
    }

    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_users(&self, tenant_id: TenantId, ids: &[UserId]) -> AppResult<Vec<User>> {
        self.users.find_many(tenant_id, ids).await
    }

    async fn list_team_members(
        &self,
        tenant_id: TenantId,
        roles: &[UserRole],
        manager_id: Option<UserId>,
    ) -> AppResult<Vec<User>> {
        self.users
            .find_active_by_roles(tenant_id, roles, manager_id)
            .await
    }

    async fn tasks_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<Task>> {
        self.activity.tasks_for_user(tenant_id, user_id, range).await
    }

    async fn closed_work_logs(
        &self,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<TaskWorkLog>> {
        self.activity.closed_work_logs(user_id, range).await
    }

    async fn upsert_snapshot(
        &self,
        snapshot: EmployeeReportSnapshot,
        policy: SnapshotPolicy,
    ) -> AppResult<EmployeeReportSnapshot> {
        self.snapshots.upsert(&snapshot, policy).await
    }

    async fn set_snapshot_pdf(
        &self,
        report_id: ReportId,
        user_id: UserId,
        url: &str,
    ) -> AppResult<()> {
        self.snapshots.set_pdf_url(report_id, user_id, url).await
    }

    async fn list_snapshots(&self, report_id: ReportId) -> AppResult<Vec<EmployeeReportSnapshot>> {
        self.snapshots.find_by_report(report_id).await
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(self.db.pool())
            .await
            .map(|_| ())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Database health check failed", e))
    }
}
