//! Task and work log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use taskhub_core::types::{TaskId, TenantId, UserId, WorkLogId};

use super::status::TaskStatus;

/// A task on the Kanban board.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Assigned user, if any.
    pub assignee_id: Option<UserId>,
    /// Title.
    pub title: String,
    /// Current column.
    pub status: TaskStatus,
    /// Creation time; decides membership in a report window.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// When the task moved to DONE.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// When the task was finished, falling back to the last update for
    /// rows written before `completed_at` was tracked.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            TaskStatus::Done => Some(self.completed_at.unwrap_or(self.updated_at)),
            _ => None,
        }
    }
}

/// A logged interval of work on a task.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskWorkLog {
    /// Unique log identifier.
    pub id: WorkLogId,
    /// Task worked on.
    pub task_id: TaskId,
    /// User who worked.
    pub user_id: UserId,
    /// Start of the interval.
    pub start_time: DateTime<Utc>,
    /// End of the interval; `None` while the timer is running.
    pub end_time: Option<DateTime<Utc>>,
}

impl TaskWorkLog {
    /// Length of a closed interval in minutes; `None` for an open one.
    pub fn duration_minutes(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 60_000.0)
    }
}
