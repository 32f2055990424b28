//! User repository.

use sqlx::PgPool;

use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::types::{TenantId, UserId};
use taskhub_entity::user::{User, UserRole};

/// Read-only access to users.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    /// Find the users of `tenant_id` among `ids`.
    pub async fn find_many(&self, tenant_id: TenantId, ids: &[UserId]) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE tenant_id = $1 AND id = ANY($2) ORDER BY display_name, id",
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find users", e))
    }

    /// Active users of a tenant with one of `roles`, optionally limited to
    /// the direct reports of `manager_id`.
    pub async fn find_active_by_roles(
        &self,
        tenant_id: TenantId,
        roles: &[UserRole],
        manager_id: Option<UserId>,
    ) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE tenant_id = $1 AND is_active AND role = ANY($2) \
             AND ($3::uuid IS NULL OR manager_id = $3) ORDER BY display_name, id",
        )
        .bind(tenant_id)
        .bind(roles)
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list team members", e))
    }
}
