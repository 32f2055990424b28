//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles known to the reporting pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Oversees every manager and operator of the tenant.
    ProjectManager,
    /// Leads the operators assigned to them.
    Manager,
    /// Works on tasks.
    Operator,
}

impl UserRole {
    /// Whether the role may request TEAM reports.
    pub fn can_request_team_reports(&self) -> bool {
        matches!(self, Self::ProjectManager | Self::Manager)
    }

    /// Whether the role sees every report of the tenant.
    pub fn sees_all_reports(&self) -> bool {
        matches!(self, Self::ProjectManager)
    }

    /// Return the role as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectManager => "PROJECT_MANAGER",
            Self::Manager => "MANAGER",
            Self::Operator => "OPERATOR",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PROJECT_MANAGER" => Ok(Self::ProjectManager),
            "MANAGER" => Ok(Self::Manager),
            "OPERATOR" => Ok(Self::Operator),
            other => Err(format!("Unknown user role: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [UserRole::ProjectManager, UserRole::Manager, UserRole::Operator] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
    }

    #[test]
    fn test_operators_cannot_request_team_reports() {
        assert!(!UserRole::Operator.can_request_team_reports());
        assert!(UserRole::Manager.can_request_team_reports());
    }
}
