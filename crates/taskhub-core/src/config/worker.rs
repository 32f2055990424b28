//! Report worker configuration.

use serde::{Deserialize, Serialize};

/// What happens when a snapshot for the same report and user already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Overwrite statistics with the fresh values; an existing PDF URL is
    /// never replaced by an absent one.
    #[default]
    Refresh,
    /// Leave the existing row untouched.
    KeepFirst,
}

impl SnapshotPolicy {
    /// Name used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::KeepFirst => "keep_first",
        }
    }
}

/// Report worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker name used in alerts and lease tokens. Empty derives one from
    /// the host name and process id.
    #[serde(default)]
    pub name: String,
    /// Number of jobs processed concurrently by one worker process.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between polls of an empty queue.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Users of one report processed concurrently.
    #[serde(default = "default_user_concurrency")]
    pub user_concurrency: usize,
    /// Snapshot upsert policy.
    #[serde(default)]
    pub snapshot_policy: SnapshotPolicy,
    /// Interval in seconds between queue connection probes.
    #[serde(default = "default_health_probe")]
    pub health_probe_seconds: u64,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            user_concurrency: default_user_concurrency(),
            snapshot_policy: SnapshotPolicy::default(),
            health_probe_seconds: default_health_probe(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

impl WorkerConfig {
    /// Resolve the worker name, falling back to `report-worker-{pid}`.
    pub fn resolved_name(&self) -> String {
        if self.name.is_empty() {
            format!("report-worker-{}", std::process::id())
        } else {
            self.name.clone()
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_poll_interval() -> u64 {
    1
}

fn default_user_concurrency() -> usize {
    1
}

fn default_health_probe() -> u64 {
    5
}

fn default_shutdown_grace() -> u64 {
    60
}
