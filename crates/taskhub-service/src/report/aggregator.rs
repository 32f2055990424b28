//! Per-user statistics of a report window.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use taskhub_core::config::SnapshotPolicy;
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_database::ReportStore;
use taskhub_entity::report::Report;
use taskhub_entity::snapshot::{EmployeeReportSnapshot, SnapshotStats};
use taskhub_entity::task::{Task, TaskStatus, TaskWorkLog};
use taskhub_entity::user::User;

/// Working days assumed per report period for the daily average.
const WORKING_DAYS: f64 = 5.0;
/// Largest contribution of logged hours to the productivity score.
const MAX_HOURS_BONUS: f64 = 30.0;

/// Round to two decimal places, half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the snapshot figures from rows already filtered to the window.
///
/// Open work logs contribute nothing.
pub fn compute_stats(tasks: &[Task], logs: &[TaskWorkLog]) -> SnapshotStats {
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count() as i32;

    let total_tasks = tasks.len() as i32;
    let completed_tasks = count(TaskStatus::Done);
    let todo_tasks = count(TaskStatus::Todo);
    let working_tasks = count(TaskStatus::Working);

    let total_minutes: f64 = logs.iter().filter_map(TaskWorkLog::duration_minutes).sum();
    let total_hours = (total_minutes / 60.0).round() as i32;
    let avg_daily_hours = round2(f64::from(total_hours) / WORKING_DAYS);

    let completion_rate = if total_tasks == 0 {
        0
    } else {
        (f64::from(completed_tasks) / f64::from(total_tasks) * 100.0).round() as i32
    };
    let productivity_score =
        (f64::from(completion_rate) + (avg_daily_hours * 5.0).min(MAX_HOURS_BONUS)).min(100.0);

    SnapshotStats {
        total_tasks,
        completed_tasks,
        todo_tasks,
        working_tasks,
        total_minutes,
        total_hours,
        avg_daily_hours,
        completion_rate,
        productivity_score,
    }
}

/// Result of aggregating one user.
#[derive(Debug, Clone)]
pub struct UserAggregate {
    /// The stored snapshot row.
    pub snapshot: EmployeeReportSnapshot,
    /// Tasks of the window, kept for the completion trend.
    pub tasks: Vec<Task>,
}

/// Loads a user's window and writes the snapshot.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    /// Persistence.
    store: Arc<dyn ReportStore>,
    /// What to do with an existing snapshot.
    policy: SnapshotPolicy,
}

impl ReportAggregator {
    /// Creates a new aggregator.
    pub fn new(store: Arc<dyn ReportStore>, policy: SnapshotPolicy) -> Self {
        Self { store, policy }
    }

    /// Aggregate `user` over the window of `report` and upsert the snapshot.
    pub async fn aggregate(&self, report: &Report, user: &User) -> AppResult<UserAggregate> {
        if user.tenant_id != report.tenant_id {
            return Err(AppError::not_found(format!(
                "User {} not found in tenant {}",
                user.id, report.tenant_id
            )));
        }

        let range = report.range();
        let tasks = self
            .store
            .tasks_for_user(report.tenant_id, user.id, &range)
            .await?;
        let logs = self.store.closed_work_logs(user.id, &range).await?;
        let stats = compute_stats(&tasks, &logs);

        debug!(
            report_id = %report.id,
            user_id = %user.id,
            total_tasks = stats.total_tasks,
            total_hours = stats.total_hours,
            policy = self.policy.as_str(),
            "Aggregated user statistics"
        );

        let row = EmployeeReportSnapshot::new(
            report.id,
            report.tenant_id,
            user.id,
            &stats,
            report.from_date,
            report.to_date,
            Utc::now(),
        );
        let snapshot = self.store.upsert_snapshot(row, self.policy).await?;

        Ok(UserAggregate { snapshot, tasks })
    }
}
