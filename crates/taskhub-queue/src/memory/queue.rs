//! In-memory job queue with lease semantics matching the Redis backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use taskhub_core::traits::queue::{
    Delivery, EnqueueOutcome, FailureDisposition, JobQueue, NewJob, QueueError, QueueStats,
    StalledJobs, stalled_error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
struct JobRecord {
    name: String,
    payload: serde_json::Value,
    max_attempts: u32,
    attempts: u32,
    state: JobState,
    last_error: Option<String>,
    reserved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<String>,
    active: Vec<String>,
    failed: Vec<String>,
    jobs: HashMap<String, JobRecord>,
    leases: HashMap<String, Lease>,
}

impl QueueState {
    fn lease_held(&self, delivery: &Delivery) -> bool {
        self.leases
            .get(&delivery.job_id)
            .is_some_and(|l| l.token == delivery.token && l.expires_at > Instant::now())
    }
}

/// In-process [`JobQueue`].
///
/// Leases expire on the tokio clock, so tests may use paused time.
#[derive(Debug)]
pub struct MemoryJobQueue {
    name: String,
    state: Mutex<QueueState>,
    reachable: AtomicBool,
}

impl MemoryJobQueue {
    /// Create an empty queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            reachable: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, QueueError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(QueueError::ConnectionRefused(
                "connect ECONNREFUSED (memory queue unreachable)".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| QueueError::Backend("memory queue lock poisoned".to_string()))
    }

    fn lease_lost(delivery: &Delivery) -> QueueError {
        QueueError::LeaseLost {
            job_id: delivery.job_id.clone(),
        }
    }

    /// Simulate the broker going away (`false`) or coming back (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Drop the lease of an active job, as a broker restart would.
    pub fn drop_lease(&self, job_id: &str) -> Result<bool, QueueError> {
        Ok(self.lock()?.leases.remove(job_id).is_some())
    }

    /// Last recorded error of a job.
    pub fn last_error(&self, job_id: &str) -> Result<Option<String>, QueueError> {
        Ok(self
            .lock()?
            .jobs
            .get(job_id)
            .and_then(|job| job.last_error.clone()))
    }

    /// Ids of jobs in the failed list.
    pub fn failed_jobs(&self) -> Result<Vec<String>, QueueError> {
        Ok(self.lock()?.failed.clone())
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError> {
        let mut state = self.lock()?;
        if let Some(existing) = state.jobs.get(&job.id)
            && matches!(existing.state, JobState::Waiting | JobState::Active)
        {
            return Ok(EnqueueOutcome::Duplicate);
        }

        state.failed.retain(|id| id != &job.id);
        state.jobs.insert(
            job.id.clone(),
            JobRecord {
                name: job.name,
                payload: job.payload,
                max_attempts: job.max_attempts.max(1),
                attempts: 0,
                state: JobState::Waiting,
                last_error: None,
                reserved_at: None,
            },
        );
        state.waiting.push_back(job.id);
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn reserve(&self, worker: &str, lease: Duration) -> Result<Option<Delivery>, QueueError> {
        let mut state = self.lock()?;
        let Some(job_id) = state.waiting.pop_front() else {
            return Ok(None);
        };
        let token = Uuid::new_v4().to_string();
        state.active.push(job_id.clone());
        state.leases.insert(
            job_id.clone(),
            Lease {
                token: token.clone(),
                expires_at: Instant::now() + lease,
            },
        );

        let Some(job) = state.jobs.get_mut(&job_id) else {
            return Err(QueueError::Backend(format!("job record {job_id} missing")));
        };
        let reserved_at = Utc::now();
        job.attempts += 1;
        job.state = JobState::Active;
        job.reserved_at = Some(reserved_at);
        tracing::debug!(queue = %self.name, job_id = %job_id, worker, "Job reserved");

        Ok(Some(Delivery {
            queue: self.name.clone(),
            job_id,
            name: job.name.clone(),
            payload: job.payload.clone(),
            attempt: job.attempts,
            max_attempts: job.max_attempts,
            token,
            reserved_at,
        }))
    }

    async fn extend_lease(&self, delivery: &Delivery, lease: Duration) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        if !state.lease_held(delivery) {
            return Err(Self::lease_lost(delivery));
        }
        if let Some(held) = state.leases.get_mut(&delivery.job_id) {
            held.expires_at = Instant::now() + lease;
        }
        Ok(())
    }

    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.lock()?;
        if !state.lease_held(delivery) {
            return Err(Self::lease_lost(delivery));
        }
        state.leases.remove(&delivery.job_id);
        state.active.retain(|id| id != &delivery.job_id);
        if let Some(job) = state.jobs.get_mut(&delivery.job_id) {
            job.state = JobState::Completed;
        }
        Ok(())
    }

    async fn fail(
        &self,
        delivery: &Delivery,
        error: &str,
        retry: bool,
    ) -> Result<FailureDisposition, QueueError> {
        let mut state = self.lock()?;
        if !state.lease_held(delivery) {
            return Err(Self::lease_lost(delivery));
        }
        state.leases.remove(&delivery.job_id);
        state.active.retain(|id| id != &delivery.job_id);

        let Some(job) = state.jobs.get_mut(&delivery.job_id) else {
            return Err(QueueError::Backend(format!(
                "job record {} missing",
                delivery.job_id
            )));
        };
        job.last_error = Some(error.to_string());
        if retry && job.attempts < job.max_attempts {
            job.state = JobState::Waiting;
            state.waiting.push_back(delivery.job_id.clone());
            Ok(FailureDisposition::Retrying)
        } else {
            job.state = JobState::Failed;
            state.failed.push(delivery.job_id.clone());
            Ok(FailureDisposition::Exhausted)
        }
    }

    async fn recover_stalled(&self) -> Result<StalledJobs, QueueError> {
        let mut state = self.lock()?;
        let now = Instant::now();
        let (stalled, alive): (Vec<String>, Vec<String>) =
            std::mem::take(&mut state.active).into_iter().partition(|id| {
                state
                    .leases
                    .get(id)
                    .is_none_or(|lease| lease.expires_at <= now)
            });
        state.active = alive;

        let state = &mut *state;
        let mut swept = StalledJobs::default();
        for id in stalled.iter().rev() {
            state.leases.remove(id);
            let Some(job) = state.jobs.get_mut(id) else {
                continue;
            };
            if job.attempts < job.max_attempts {
                job.state = JobState::Waiting;
                state.waiting.push_front(id.clone());
                swept.requeued += 1;
                continue;
            }

            job.state = JobState::Failed;
            job.last_error = Some(stalled_error(job.attempts, job.max_attempts));
            swept.exhausted.push(Delivery {
                queue: self.name.clone(),
                job_id: id.clone(),
                name: job.name.clone(),
                payload: job.payload.clone(),
                attempt: job.attempts,
                max_attempts: job.max_attempts,
                token: String::new(),
                reserved_at: job.reserved_at.unwrap_or_else(Utc::now),
            });
            state.failed.push(id.clone());
        }
        swept.exhausted.reverse();
        Ok(swept)
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let state = self.lock()?;
        Ok(QueueStats {
            waiting: state.waiting.len() as u64,
            active: state.active.len() as u64,
            failed: state.failed.len() as u64,
        })
    }

    async fn ping(&self) -> Result<(), QueueError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(id: &str, max_attempts: u32) -> NewJob {
        NewJob {
            id: id.to_string(),
            name: "generate-report".to_string(),
            payload: json!({ "reportId": id }),
            max_attempts,
        }
    }

    const LEASE: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_reserve_is_fifo_and_exclusive() {
        let queue = MemoryJobQueue::new("report-generation");
        queue.enqueue(job("a", 1)).await.expect("enqueue a");
        queue.enqueue(job("b", 1)).await.expect("enqueue b");

        let first = queue.reserve("w1", LEASE).await.expect("reserve").expect("job");
        let second = queue.reserve("w2", LEASE).await.expect("reserve").expect("job");
        assert_eq!(first.job_id, "a");
        assert_eq!(second.job_id, "b");
        assert!(queue.reserve("w3", LEASE).await.expect("reserve").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_while_pending() {
        let queue = MemoryJobQueue::new("q");
        assert_eq!(
            queue.enqueue(job("a", 1)).await.expect("enqueue"),
            EnqueueOutcome::Enqueued
        );
        assert_eq!(
            queue.enqueue(job("a", 1)).await.expect("enqueue"),
            EnqueueOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn test_dropped_lease_surfaces_as_lease_lost() {
        let queue = MemoryJobQueue::new("q");
        queue.enqueue(job("a", 1)).await.expect("enqueue");
        let delivery = queue.reserve("w", LEASE).await.expect("reserve").expect("job");

        assert!(queue.drop_lease("a").expect("drop"));
        let err = queue.complete(&delivery).await.expect_err("lease is gone");
        assert!(matches!(err, QueueError::LeaseLost { ref job_id } if job_id == "a"));
        assert!(err.to_string().contains("Missing lock"));
    }

    #[tokio::test]
    async fn test_fail_retries_until_attempts_exhausted() {
        let queue = MemoryJobQueue::new("q");
        queue.enqueue(job("a", 2)).await.expect("enqueue");

        let first = queue.reserve("w", LEASE).await.expect("reserve").expect("job");
        assert_eq!(
            queue.fail(&first, "boom", true).await.expect("fail"),
            FailureDisposition::Retrying
        );
        let second = queue.reserve("w", LEASE).await.expect("reserve").expect("job");
        assert_eq!(second.attempt, 2);
        assert!(second.is_last_attempt());
        assert_eq!(
            queue.fail(&second, "boom again", true).await.expect("fail"),
            FailureDisposition::Exhausted
        );
        assert_eq!(queue.failed_jobs().expect("failed"), vec!["a".to_string()]);
        assert_eq!(queue.last_error("a").expect("error").as_deref(), Some("boom again"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_is_recovered() {
        let queue = MemoryJobQueue::new("q");
        queue.enqueue(job("a", 2)).await.expect("enqueue");
        let stale = queue
            .reserve("w", Duration::from_secs(5))
            .await
            .expect("reserve")
            .expect("job");

        tokio::time::advance(Duration::from_secs(6)).await;
        let swept = queue.recover_stalled().await.expect("recover");
        assert_eq!(swept.requeued, 1);
        assert!(swept.exhausted.is_empty());
        assert!(matches!(
            queue.extend_lease(&stale, LEASE).await,
            Err(QueueError::LeaseLost { .. })
        ));

        let again = queue.reserve("w", LEASE).await.expect("reserve").expect("job");
        assert_eq!(again.job_id, "a");
        assert_ne!(again.token, stale.token);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_job_fails_once_attempts_are_used_up() {
        let queue = MemoryJobQueue::new("q");
        queue.enqueue(job("a", 2)).await.expect("enqueue");
        let short = Duration::from_secs(5);

        queue.reserve("w", short).await.expect("reserve").expect("first");
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(queue.recover_stalled().await.expect("recover").requeued, 1);

        let second = queue.reserve("w", short).await.expect("reserve").expect("second");
        assert_eq!(second.attempt, 2);
        tokio::time::advance(Duration::from_secs(6)).await;
        let swept = queue.recover_stalled().await.expect("recover");
        assert_eq!(swept.requeued, 0);
        assert_eq!(swept.exhausted.len(), 1);
        let dead = &swept.exhausted[0];
        assert_eq!(dead.job_id, "a");
        assert_eq!(dead.attempt, 2);
        assert_eq!(dead.payload, json!({ "reportId": "a" }));
        assert!(dead.token.is_empty());

        assert!(queue.reserve("w", short).await.expect("reserve").is_none());
        assert_eq!(queue.failed_jobs().expect("failed"), vec!["a".to_string()]);
        assert_eq!(
            queue.last_error("a").expect("error").as_deref(),
            Some("Job stalled: lease expired on attempt 2 of 2")
        );
        let stats = queue.stats().await.expect("stats");
        assert_eq!((stats.waiting, stats.active, stats.failed), (0, 0, 1));

        let swept = queue.recover_stalled().await.expect("recover");
        assert_eq!(swept.requeued, 0);
        assert!(swept.exhausted.is_empty());
    }

    #[tokio::test]
    async fn test_live_lease_is_not_swept() {
        let queue = MemoryJobQueue::new("q");
        queue.enqueue(job("a", 1)).await.expect("enqueue");
        let held = queue.reserve("w", LEASE).await.expect("reserve").expect("job");

        let swept = queue.recover_stalled().await.expect("recover");
        assert_eq!(swept.requeued, 0);
        assert!(swept.exhausted.is_empty());
        queue.complete(&held).await.expect("still owned");
    }

    #[tokio::test]
    async fn test_unreachable_queue_refuses_connections() {
        let queue = MemoryJobQueue::new("q");
        queue.set_reachable(false);
        assert!(queue.ping().await.expect_err("refused").is_connection_refused());
        queue.set_reachable(true);
        assert!(queue.ping().await.is_ok());
    }
}
