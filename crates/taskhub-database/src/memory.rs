//! In-process [`ReportStore`] for tests and local runs without PostgreSQL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use taskhub_core::config::SnapshotPolicy;
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::types::pagination::{PageRequest, PageResponse};
use taskhub_core::types::{DateRange, ReportId, TenantId, UserId};
use taskhub_entity::report::{
    BatchOutcome, CreateReport, Report, ReportFilter, ReportStatusKind, ReportSummary,
};
use taskhub_entity::snapshot::EmployeeReportSnapshot;
use taskhub_entity::task::{Task, TaskWorkLog};
use taskhub_entity::user::{User, UserRole};

use crate::store::{ReportArtifacts, ReportStore};

#[derive(Debug, Default)]
struct Tables {
    reports: HashMap<ReportId, Report>,
    snapshots: HashMap<(ReportId, UserId), EmployeeReportSnapshot>,
    users: HashMap<UserId, User>,
    tasks: Vec<Task>,
    work_logs: Vec<TaskWorkLog>,
}

/// [`ReportStore`] backed by hash maps behind a mutex.
#[derive(Debug)]
pub struct MemoryReportStore {
    tables: Mutex<Tables>,
    healthy: AtomicBool,
}

impl Default for MemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReportStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            healthy: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::database("In-memory store lock poisoned"))
    }

    /// Seed a user.
    pub fn insert_user(&self, user: User) -> AppResult<()> {
        self.lock()?.users.insert(user.id, user);
        Ok(())
    }

    /// Seed a task.
    pub fn insert_task(&self, task: Task) -> AppResult<()> {
        self.lock()?.tasks.push(task);
        Ok(())
    }

    /// Seed a work log.
    pub fn insert_work_log(&self, log: TaskWorkLog) -> AppResult<()> {
        self.lock()?.work_logs.push(log);
        Ok(())
    }

    /// Seed a report row as-is.
    pub fn insert_report(&self, report: Report) -> AppResult<()> {
        self.lock()?.reports.insert(report.id, report);
        Ok(())
    }

    /// Make [`ReportStore::health_check`] fail or succeed.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create_report(&self, input: CreateReport) -> AppResult<Report> {
        let report = input.into_report(Utc::now());
        self.lock()?.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn find_report(&self, id: ReportId) -> AppResult<Option<Report>> {
        Ok(self.lock()?.reports.get(&id).cloned())
    }

    async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Report>> {
        let tables = self.lock()?;
        let mut matching: Vec<&Report> = tables
            .reports
            .values()
            .filter(|report| filter.matches(report))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(PageResponse::new(items, page, total))
    }

    async fn summarize_reports(&self, filter: &ReportFilter) -> AppResult<ReportSummary> {
        let filter = ReportFilter {
            status: None,
            ..filter.clone()
        };
        let tables = self.lock()?;
        let mut summary = ReportSummary::default();
        for report in tables.reports.values().filter(|r| filter.matches(r)) {
            summary.add(report.status, report.report_type, 1);
        }
        Ok(summary)
    }

    async fn begin_attempt(&self, id: ReportId) -> AppResult<Option<Report>> {
        let mut tables = self.lock()?;
        let Some(report) = tables.reports.get_mut(&id) else {
            return Ok(None);
        };
        if report.status == ReportStatusKind::Ready {
            return Ok(None);
        }
        report.status = ReportStatusKind::Generating;
        report.failure_reason = None;
        report.attempts += 1;
        report.updated_at = Utc::now();
        Ok(Some(report.clone()))
    }

    async fn mark_ready(
        &self,
        id: ReportId,
        artifacts: ReportArtifacts,
        outcome: &BatchOutcome,
    ) -> AppResult<()> {
        let mut tables = self.lock()?;
        if let Some(report) = tables.reports.get_mut(&id) {
            let now = Utc::now();
            report.status = ReportStatusKind::Ready;
            report.failure_reason = None;
            report.pdf_url = artifacts.pdf_url;
            report.excel_url = artifacts.excel_url;
            report.outcome = Some(Json(outcome.clone()));
            report.completed_at = Some(now);
            report.updated_at = now;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: ReportId,
        reason: &str,
        outcome: Option<&BatchOutcome>,
    ) -> AppResult<()> {
        let mut tables = self.lock()?;
        if let Some(report) = tables.reports.get_mut(&id) {
            if report.status == ReportStatusKind::Ready {
                return Ok(());
            }
            report.status = ReportStatusKind::Failed;
            report.failure_reason = Some(reason.to_string());
            if let Some(outcome) = outcome {
                report.outcome = Some(Json(outcome.clone()));
            }
            report.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset_failed(&self, id: ReportId) -> AppResult<Option<Report>> {
        let mut tables = self.lock()?;
        match tables.reports.get_mut(&id) {
            Some(report) if report.status == ReportStatusKind::Failed => {
                report.status = ReportStatusKind::Generating;
                report.failure_reason = None;
                report.updated_at = Utc::now();
                Ok(Some(report.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_users(&self, tenant_id: TenantId, ids: &[UserId]) -> AppResult<Vec<User>> {
        let tables = self.lock()?;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id && ids.contains(&u.id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn list_team_members(
        &self,
        tenant_id: TenantId,
        roles: &[UserRole],
        manager_id: Option<UserId>,
    ) -> AppResult<Vec<User>> {
        let tables = self.lock()?;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| {
                u.tenant_id == tenant_id
                    && u.is_active
                    && roles.contains(&u.role)
                    && manager_id.is_none_or(|m| u.manager_id == Some(m))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn tasks_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<Task>> {
        let tables = self.lock()?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| {
                t.tenant_id == tenant_id
                    && t.assignee_id == Some(user_id)
                    && range.contains(t.created_at)
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn closed_work_logs(
        &self,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<TaskWorkLog>> {
        let (start, end) = (range.window_start(), range.window_end());
        let tables = self.lock()?;
        let mut logs: Vec<TaskWorkLog> = tables
            .work_logs
            .iter()
            .filter(|l| {
                l.user_id == user_id
                    && l.start_time >= start
                    && l.end_time.is_some_and(|e| e <= end)
            })
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.start_time);
        Ok(logs)
    }

    async fn upsert_snapshot(
        &self,
        snapshot: EmployeeReportSnapshot,
        policy: SnapshotPolicy,
    ) -> AppResult<EmployeeReportSnapshot> {
        let mut tables = self.lock()?;
        let key = (snapshot.report_id, snapshot.user_id);
        let stored = match tables.snapshots.get_mut(&key) {
            Some(existing) => {
                if policy == SnapshotPolicy::Refresh {
                    existing.refresh(&snapshot.stats(), snapshot.updated_at);
                    if snapshot.pdf_url.is_some() {
                        existing.pdf_url = snapshot.pdf_url;
                    }
                }
                existing.clone()
            }
            None => {
                tables.snapshots.insert(key, snapshot.clone());
                snapshot
            }
        };
        Ok(stored)
    }

    async fn set_snapshot_pdf(
        &self,
        report_id: ReportId,
        user_id: UserId,
        url: &str,
    ) -> AppResult<()> {
        let mut tables = self.lock()?;
        let snapshot = tables
            .snapshots
            .get_mut(&(report_id, user_id))
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "No snapshot for report {report_id} and user {user_id}"
                ))
            })?;
        snapshot.pdf_url = Some(url.to_string());
        snapshot.updated_at = Utc::now();
        Ok(())
    }

    async fn list_snapshots(&self, report_id: ReportId) -> AppResult<Vec<EmployeeReportSnapshot>> {
        let tables = self.lock()?;
        let mut snapshots: Vec<EmployeeReportSnapshot> = tables
            .snapshots
            .values()
            .filter(|s| s.report_id == report_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.user_id.cmp(&b.user_id)));
        Ok(snapshots)
    }

    async fn health_check(&self) -> AppResult<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::database("In-memory store marked unhealthy"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskhub_entity::report::{ReportScope, ReportType};
    use taskhub_entity::snapshot::SnapshotStats;

    fn range() -> DateRange {
        DateRange::unchecked(
            NaiveDate::from_ymd_opt(2024, 3, 4).expect("date"),
            NaiveDate::from_ymd_opt(2024, 3, 10).expect("date"),
        )
    }

    fn stats(total: i32) -> SnapshotStats {
        SnapshotStats {
            total_tasks: total,
            completed_tasks: 0,
            todo_tasks: total,
            working_tasks: 0,
            total_minutes: 0.0,
            total_hours: 0,
            avg_daily_hours: 0.0,
            completion_rate: 0,
            productivity_score: 0.0,
        }
    }

    async fn report(store: &MemoryReportStore) -> Report {
        store
            .create_report(CreateReport {
                tenant_id: TenantId::new(),
                report_type: ReportType::Weekly,
                scope: ReportScope::Employee,
                requested_by: UserId::new(),
                employee_ids: Vec::new(),
                range: range(),
            })
            .await
            .expect("create report")
    }

    fn snapshot(report: &Report, user_id: UserId, total: i32) -> EmployeeReportSnapshot {
        EmployeeReportSnapshot::new(
            report.id,
            report.tenant_id,
            user_id,
            &stats(total),
            report.from_date,
            report.to_date,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_refresh_policy_overwrites_stats_once_per_user() {
        let store = MemoryReportStore::new();
        let report = report(&store).await;
        let user = UserId::new();

        let first = store
            .upsert_snapshot(snapshot(&report, user, 2), SnapshotPolicy::Refresh)
            .await
            .expect("first upsert");
        store
            .set_snapshot_pdf(report.id, user, "http://files/a.pdf")
            .await
            .expect("pdf");
        let second = store
            .upsert_snapshot(snapshot(&report, user, 5), SnapshotPolicy::Refresh)
            .await
            .expect("second upsert");

        assert_eq!(second.id, first.id);
        assert_eq!(second.total_tasks, 5);
        assert_eq!(second.pdf_url.as_deref(), Some("http://files/a.pdf"));
        assert_eq!(store.list_snapshots(report.id).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_keep_first_policy_ignores_later_writes() {
        let store = MemoryReportStore::new();
        let report = report(&store).await;
        let user = UserId::new();

        store
            .upsert_snapshot(snapshot(&report, user, 2), SnapshotPolicy::KeepFirst)
            .await
            .expect("first upsert");
        let second = store
            .upsert_snapshot(snapshot(&report, user, 9), SnapshotPolicy::KeepFirst)
            .await
            .expect("second upsert");

        assert_eq!(second.total_tasks, 2);
        assert_eq!(store.list_snapshots(report.id).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_ready_report_is_never_failed_or_restarted() {
        let store = MemoryReportStore::new();
        let report = report(&store).await;

        store
            .mark_ready(report.id, ReportArtifacts::default(), &BatchOutcome::default())
            .await
            .expect("ready");
        store
            .mark_failed(report.id, "late failure", None)
            .await
            .expect("failed");

        let stored = store.find_report(report.id).await.expect("find").expect("exists");
        assert_eq!(stored.status, ReportStatusKind::Ready);
        assert!(store.begin_attempt(report.id).await.expect("begin").is_none());
    }

    #[tokio::test]
    async fn test_retry_only_from_failed() {
        let store = MemoryReportStore::new();
        let report = report(&store).await;
        assert!(store.reset_failed(report.id).await.expect("reset").is_none());

        store
            .mark_failed(report.id, "browser missing", None)
            .await
            .expect("failed");
        let reset = store.reset_failed(report.id).await.expect("reset").expect("reset row");
        assert_eq!(reset.status, ReportStatusKind::Generating);
        assert!(reset.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_set_pdf_without_snapshot_is_not_found() {
        let store = MemoryReportStore::new();
        let err = store
            .set_snapshot_pdf(ReportId::new(), UserId::new(), "x")
            .await
            .expect_err("missing snapshot");
        assert_eq!(err.kind, taskhub_core::error::ErrorKind::NotFound);
    }
}
