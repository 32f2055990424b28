//! Redis key layout of one queue.
//!
//! Every key lives under `{prefix}{queue}:` so several queues can share a
//! Redis database.

/// Key builder for a single queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    base: String,
}

impl QueueKeys {
    /// Keys for `queue` under `prefix`.
    pub fn new(prefix: &str, queue: &str) -> Self {
        Self {
            base: format!("{prefix}{queue}:"),
        }
    }

    /// List of job ids waiting for a worker; pushed left, popped right.
    pub fn waiting(&self) -> String {
        format!("{}waiting", self.base)
    }

    /// List of job ids currently reserved.
    pub fn active(&self) -> String {
        format!("{}active", self.base)
    }

    /// List of job ids that exhausted their attempts.
    pub fn failed(&self) -> String {
        format!("{}failed", self.base)
    }

    /// Hash holding the job record.
    pub fn job(&self, job_id: &str) -> String {
        format!("{}job:{job_id}", self.base)
    }

    /// String holding the lease token of an active job.
    pub fn lock(&self, job_id: &str) -> String {
        format!("{}lock:{job_id}", self.base)
    }

    /// Prefix of every job hash, for scripts that build keys from ids.
    pub fn job_prefix(&self) -> String {
        format!("{}job:", self.base)
    }

    /// Prefix of every lease key.
    pub fn lock_prefix(&self) -> String {
        format!("{}lock:", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_queue_keys() {
        let keys = QueueKeys::new("taskhub:", "report-generation");
        assert_eq!(keys.waiting(), "taskhub:report-generation:waiting");
        assert_eq!(keys.job("r1"), "taskhub:report-generation:job:r1");
        assert_eq!(keys.lock("r1"), format!("{}r1", keys.lock_prefix()));
    }
}
