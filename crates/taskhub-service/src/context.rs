//! Request context carrying the authenticated user and tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskhub_core::types::{TenantId, UserId};
use taskhub_entity::report::ReportFilter;
use taskhub_entity::user::UserRole;

/// Context for the current authenticated request.
///
/// Built from verified token claims and passed into service methods so
/// that every operation knows *who* is acting in *which* tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// Tenant the user belongs to.
    pub tenant_id: TenantId,
    /// The user's role at the time the token was issued.
    pub role: UserRole,
    /// Display name from the token.
    pub name: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId, tenant_id: TenantId, role: UserRole, name: String) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
            name,
            request_time: Utc::now(),
        }
    }

    /// Report filter for everything this user may list.
    pub fn report_filter(&self) -> ReportFilter {
        ReportFilter {
            tenant_id: self.tenant_id,
            requested_by: if self.role.sees_all_reports() {
                None
            } else {
                Some(self.user_id)
            },
            status: None,
        }
    }
}
