//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use taskhub_core::types::{TenantId, UserId};

use super::role::UserRole;

/// A member of a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Email address.
    pub email: String,
    /// Human-readable name.
    pub display_name: String,
    /// Role within the tenant.
    pub role: UserRole,
    /// Direct manager, for operators.
    pub manager_id: Option<UserId>,
    /// Whether the account is active.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether `other` is visible to this user when picking report
    /// subjects: a project manager sees every manager and operator of the
    /// tenant, a manager sees themself and their operators, an operator
    /// only sees themself.
    pub fn can_see(&self, other: &User) -> bool {
        if self.tenant_id != other.tenant_id {
            return false;
        }
        if self.id == other.id {
            return true;
        }
        match self.role {
            UserRole::ProjectManager => {
                matches!(other.role, UserRole::Manager | UserRole::Operator)
            }
            UserRole::Manager => {
                other.role == UserRole::Operator && other.manager_id == Some(self.id)
            }
            UserRole::Operator => false,
        }
    }
}
