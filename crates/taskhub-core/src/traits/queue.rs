//! Durable job queue trait.
//!
//! A queue delivers each job to at most one worker at a time. Ownership of
//! an active job is a time-bounded lease identified by a token; the worker
//! extends the lease while it works and presents the token when it
//! completes or fails the job. A lease that expires or vanishes (broker
//! restart) surfaces as [`QueueError::LeaseLost`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};

/// A job to be enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Job id; enqueueing an id that is already waiting or active is a no-op.
    pub id: String,
    /// Job name, used to pick the handler.
    pub name: String,
    /// JSON payload handed to the handler.
    pub payload: serde_json::Value,
    /// Delivery attempts before the job is moved to the failed list.
    pub max_attempts: u32,
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The job was added to the waiting list.
    Enqueued,
    /// A job with the same id is already waiting or active.
    Duplicate,
}

/// A job reserved by a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Queue the job was reserved from.
    pub queue: String,
    /// Job id.
    pub job_id: String,
    /// Job name.
    pub name: String,
    /// JSON payload.
    pub payload: serde_json::Value,
    /// Attempt number of this delivery, starting at 1.
    pub attempt: u32,
    /// Configured attempt limit.
    pub max_attempts: u32,
    /// Lease token proving ownership.
    pub token: String,
    /// When the job was reserved.
    pub reserved_at: DateTime<Utc>,
}

impl Delivery {
    /// Whether a failure of this delivery would exhaust the attempts.
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// What the queue did with a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Returned to the waiting list for another attempt.
    Retrying,
    /// Moved to the failed list; no further attempts.
    Exhausted,
}

/// Result of a stalled-job sweep.
#[derive(Debug, Clone, Default)]
pub struct StalledJobs {
    /// Jobs returned to the waiting list.
    pub requeued: u64,
    /// Jobs whose lease expired on their last attempt. They are in the
    /// failed list and carry an empty `token`.
    pub exhausted: Vec<Delivery>,
}

/// Error recorded for a job whose lease expired on its last attempt.
pub fn stalled_error(attempt: u32, max_attempts: u32) -> String {
    format!("Job stalled: lease expired on attempt {attempt} of {max_attempts}")
}

/// Counts per job state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting for a worker.
    pub waiting: u64,
    /// Jobs currently leased by a worker.
    pub active: u64,
    /// Jobs that exhausted their attempts.
    pub failed: u64,
}

/// Errors raised by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The lease for the job no longer belongs to the caller.
    #[error("Missing lock for job {job_id}: lease expired or was lost")]
    LeaseLost {
        /// The affected job.
        job_id: String,
    },

    /// The backing store refused the connection.
    #[error("Queue connection refused: {0}")]
    ConnectionRefused(String),

    /// Any other backend error.
    #[error("Queue backend error: {0}")]
    Backend(String),

    /// A stored job could not be decoded.
    #[error("Queue serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueueError {
    /// Whether the error signals an outage of the backing connection.
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused(_))
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        let kind = match &err {
            QueueError::ConnectionRefused(_) => ErrorKind::ServiceUnavailable,
            QueueError::Serialization(_) => ErrorKind::Serialization,
            QueueError::LeaseLost { .. } | QueueError::Backend(_) => ErrorKind::Queue,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

/// Trait for job queue backends (Redis or in-memory).
#[async_trait]
pub trait JobQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Name of the queue.
    fn name(&self) -> &str;

    /// Add a job to the waiting list unless the same id is pending.
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError>;

    /// Reserve the oldest waiting job for `worker` with a lease.
    async fn reserve(&self, worker: &str, lease: Duration) -> Result<Option<Delivery>, QueueError>;

    /// Extend the lease of an active delivery.
    async fn extend_lease(&self, delivery: &Delivery, lease: Duration) -> Result<(), QueueError>;

    /// Acknowledge a successfully processed delivery.
    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Record a failed delivery. With `retry` and attempts left the job is
    /// returned to the waiting list, otherwise it is moved to the failed list.
    async fn fail(
        &self,
        delivery: &Delivery,
        error: &str,
        retry: bool,
    ) -> Result<FailureDisposition, QueueError>;

    /// Sweep active jobs whose lease expired. Jobs with attempts left go
    /// back to the waiting list; the others are moved to the failed list
    /// with [`stalled_error`] as their last error.
    async fn recover_stalled(&self) -> Result<StalledJobs, QueueError>;

    /// Count jobs per state.
    async fn stats(&self) -> Result<QueueStats, QueueError>;

    /// Probe the backing connection.
    async fn ping(&self) -> Result<(), QueueError>;
}
