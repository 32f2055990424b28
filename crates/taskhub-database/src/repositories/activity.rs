//! Task and work log queries feeding the aggregator.

use sqlx::PgPool;

use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::types::{DateRange, TenantId, UserId};
use taskhub_entity::task::{Task, TaskWorkLog};

/// Read-only access to tasks and work logs.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Create a new activity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tasks of the tenant assigned to `user_id` and created inside `range`.
    pub async fn tasks_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<Task>> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE tenant_id = $1 AND assignee_id = $2 \
             AND created_at >= $3 AND created_at < $4 ORDER BY created_at",
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(range.window_start())
        .bind(range.window_end())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load tasks", e))
    }

    /// Closed work logs of `user_id` starting and ending inside `range`.
    pub async fn closed_work_logs(
        &self,
        user_id: UserId,
        range: &DateRange,
    ) -> AppResult<Vec<TaskWorkLog>> {
        sqlx::query_as::<_, TaskWorkLog>(
            "SELECT * FROM task_work_logs WHERE user_id = $1 AND start_time >= $2 \
             AND end_time IS NOT NULL AND end_time <= $3 ORDER BY start_time",
        )
        .bind(user_id)
        .bind(range.window_start())
        .bind(range.window_end())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load work logs", e))
    }
}
