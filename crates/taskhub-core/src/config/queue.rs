//! Job queue configuration.

use serde::{Deserialize, Serialize};

/// Job queue backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Backend: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Prefix for every key written by the queue.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Queue name shared by the producer and the worker.
    #[serde(default = "default_name")]
    pub name: String,
    /// Lease granted to a worker for an active job, in seconds.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
    /// Delivery attempts before a job is moved to the failed list.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Interval between sweeps returning stalled jobs to the waiting list.
    #[serde(default = "default_stall_check")]
    pub stall_check_seconds: u64,
    /// How long finished job records are retained, in seconds.
    #[serde(default = "default_retention")]
    pub retention_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_url(),
            key_prefix: default_key_prefix(),
            name: default_name(),
            lease_seconds: default_lease(),
            max_attempts: default_max_attempts(),
            stall_check_seconds: default_stall_check(),
            retention_seconds: default_retention(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "taskhub:".to_string()
}

fn default_name() -> String {
    "report-generation".to_string()
}

fn default_lease() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    1
}

fn default_stall_check() -> u64 {
    30
}

fn default_retention() -> u64 {
    7 * 24 * 3600
}
