//! Per-user results of one report run.

use serde::{Deserialize, Serialize};

use taskhub_core::types::UserId;

/// A user whose snapshot or PDF could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFailure {
    /// The affected user.
    pub user_id: UserId,
    /// Error message of the failed step.
    pub error: String,
}

/// Success or failure of every user in a report's scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Users whose snapshot and PDF were stored.
    pub succeeded: Vec<UserId>,
    /// Users that failed, with the error.
    pub failed: Vec<UserFailure>,
}

impl BatchOutcome {
    /// Record a success.
    pub fn record_success(&mut self, user_id: UserId) {
        self.succeeded.push(user_id);
    }

    /// Record a failure.
    pub fn record_failure(&mut self, user_id: UserId, error: impl Into<String>) {
        self.failed.push(UserFailure {
            user_id,
            error: error.into(),
        });
    }

    /// Number of users processed.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when at least one user was processed and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    /// True when some but not all users failed.
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }
}
