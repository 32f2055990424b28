//! Report type, scope and status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reporting period of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_type", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    /// One working week.
    Weekly,
    /// One calendar month.
    Monthly,
    /// Any range chosen by the requester.
    Custom,
}

impl ReportType {
    /// Return the type as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which users a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_scope", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportScope {
    /// An explicit list of employees (the requester when empty).
    Employee,
    /// Everyone under the requester's management chain.
    Team,
}

impl ReportScope {
    /// Return the scope as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "EMPLOYEE",
            Self::Team => "TEAM",
        }
    }
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted discriminant of [`ReportStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatusKind {
    /// The worker has not finished yet.
    Generating,
    /// All artifacts are available.
    Ready,
    /// The run ended without artifacts; see `failure_reason`.
    Failed,
}

impl ReportStatusKind {
    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "GENERATING",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ReportStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GENERATING" => Ok(Self::Generating),
            "READY" => Ok(Self::Ready),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("Unknown report status: '{other}'")),
        }
    }
}

/// Lifecycle state of a report run.
///
/// `Generating -> Ready` or `Generating -> Failed(reason)`; a failed report
/// may be moved back to `Generating` by an explicit retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// The worker has not finished yet.
    Generating,
    /// All artifacts are available.
    Ready,
    /// The run failed.
    Failed {
        /// Why the run failed.
        reason: String,
    },
}

impl ReportStatus {
    /// The persisted discriminant.
    pub fn kind(&self) -> ReportStatusKind {
        match self {
            Self::Generating => ReportStatusKind::Generating,
            Self::Ready => ReportStatusKind::Ready,
            Self::Failed { .. } => ReportStatusKind::Failed,
        }
    }

    /// Whether the worker will not touch the report again on its own.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Generating)
    }

    /// Whether a report in this state may be retried.
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
