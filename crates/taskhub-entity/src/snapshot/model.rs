//! Employee report snapshot model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use taskhub_core::types::{ReportId, SnapshotId, TenantId, UserId};

/// Statistics of one user over one report window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    /// Tasks assigned and created in the window.
    pub total_tasks: i32,
    /// Tasks with status DONE.
    pub completed_tasks: i32,
    /// Tasks with status TODO.
    pub todo_tasks: i32,
    /// Tasks with status WORKING.
    pub working_tasks: i32,
    /// Sum of closed work-log intervals, in minutes.
    pub total_minutes: f64,
    /// `round(total_minutes / 60)`.
    pub total_hours: i32,
    /// `round(total_hours / 5, 2)`.
    pub avg_daily_hours: f64,
    /// `round(completed / total * 100)`, 0 without tasks.
    pub completion_rate: i32,
    /// `min(100, completion_rate + min(30, avg_daily_hours * 5))`.
    pub productivity_score: f64,
}

/// One row per (report, user).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeReportSnapshot {
    /// Unique snapshot identifier.
    pub id: SnapshotId,
    /// Parent report.
    pub report_id: ReportId,
    /// Tenant of the parent report.
    pub tenant_id: TenantId,
    /// The user described.
    pub user_id: UserId,
    /// See [`SnapshotStats::total_tasks`].
    pub total_tasks: i32,
    /// See [`SnapshotStats::completed_tasks`].
    pub completed_tasks: i32,
    /// See [`SnapshotStats::todo_tasks`].
    pub todo_tasks: i32,
    /// See [`SnapshotStats::working_tasks`].
    pub working_tasks: i32,
    /// See [`SnapshotStats::total_minutes`].
    pub total_minutes: f64,
    /// See [`SnapshotStats::total_hours`].
    pub total_hours: i32,
    /// See [`SnapshotStats::avg_daily_hours`].
    pub avg_daily_hours: f64,
    /// See [`SnapshotStats::completion_rate`].
    pub completion_rate: i32,
    /// See [`SnapshotStats::productivity_score`].
    pub productivity_score: f64,
    /// Per-user PDF, set after a successful upload.
    pub pdf_url: Option<String>,
    /// Copied from the parent report.
    pub from_date: NaiveDate,
    /// Copied from the parent report.
    pub to_date: NaiveDate,
    /// First write.
    pub created_at: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

impl EmployeeReportSnapshot {
    /// Build a fresh row for `stats`.
    pub fn new(
        report_id: ReportId,
        tenant_id: TenantId,
        user_id: UserId,
        stats: &SnapshotStats,
        from_date: NaiveDate,
        to_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            report_id,
            tenant_id,
            user_id,
            total_tasks: stats.total_tasks,
            completed_tasks: stats.completed_tasks,
            todo_tasks: stats.todo_tasks,
            working_tasks: stats.working_tasks,
            total_minutes: stats.total_minutes,
            total_hours: stats.total_hours,
            avg_daily_hours: stats.avg_daily_hours,
            completion_rate: stats.completion_rate,
            productivity_score: stats.productivity_score,
            pdf_url: None,
            from_date,
            to_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// The statistics part of the row.
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            total_tasks: self.total_tasks,
            completed_tasks: self.completed_tasks,
            todo_tasks: self.todo_tasks,
            working_tasks: self.working_tasks,
            total_minutes: self.total_minutes,
            total_hours: self.total_hours,
            avg_daily_hours: self.avg_daily_hours,
            completion_rate: self.completion_rate,
            productivity_score: self.productivity_score,
        }
    }

    /// Overwrite the statistics, keeping identity, timestamps of creation
    /// and the PDF URL.
    pub fn refresh(&mut self, stats: &SnapshotStats, now: DateTime<Utc>) {
        self.total_tasks = stats.total_tasks;
        self.completed_tasks = stats.completed_tasks;
        self.todo_tasks = stats.todo_tasks;
        self.working_tasks = stats.working_tasks;
        self.total_minutes = stats.total_minutes;
        self.total_hours = stats.total_hours;
        self.avg_daily_hours = stats.avg_daily_hours;
        self.completion_rate = stats.completion_rate;
        self.productivity_score = stats.productivity_score;
        self.updated_at = now;
    }
}
