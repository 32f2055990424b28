//! Reliable job queue on Redis.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::Script;
use tracing::{debug, warn};
use uuid::Uuid;

use taskhub_core::traits::queue::{
    Delivery, EnqueueOutcome, FailureDisposition, JobQueue, NewJob, QueueError, QueueStats,
    StalledJobs,
};

use super::client::{RedisClient, map_redis_error};
use super::scripts;
use crate::keys::QueueKeys;

type ReservedRow = (String, String, String, u32, u32);
type StalledRow = (String, String, String, u32, u32, i64);

/// Redis-backed [`JobQueue`].
///
/// Waiting and active jobs are Redis lists; each active job owns a lease
/// key written with `PX` that the worker must keep extending. Every state
/// transition runs as a Lua script so a stale token can never complete or
/// fail a job another worker holds.
#[derive(Debug, Clone)]
pub struct RedisJobQueue {
    client: RedisClient,
    name: String,
    keys: QueueKeys,
    retention_seconds: u64,
    enqueue: Script,
    reserve: Script,
    extend: Script,
    complete: Script,
    fail: Script,
    recover: Script,
}

impl RedisJobQueue {
    /// Create a queue named `name` with keys under `key_prefix`.
    pub fn new(client: RedisClient, key_prefix: &str, name: &str, retention_seconds: u64) -> Self {
        Self {
            client,
            name: name.to_string(),
            keys: QueueKeys::new(key_prefix, name),
            retention_seconds,
            enqueue: Script::new(scripts::ENQUEUE),
            reserve: Script::new(scripts::RESERVE),
            extend: Script::new(scripts::EXTEND),
            complete: Script::new(scripts::COMPLETE),
            fail: Script::new(scripts::FAIL),
            recover: Script::new(scripts::RECOVER_STALLED),
        }
    }

    fn lease_lost(delivery: &Delivery) -> QueueError {
        QueueError::LeaseLost {
            job_id: delivery.job_id.clone(),
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError> {
        let payload = serde_json::to_string(&job.payload)?;
        let mut conn = self.client.conn_mut();
        let added: i64 = self
            .enqueue
            .key(self.keys.waiting())
            .key(self.keys.failed())
            .key(self.keys.job(&job.id))
            .arg(&job.id)
            .arg(&job.name)
            .arg(payload)
            .arg(job.max_attempts.max(1))
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        if added == 1 {
            debug!(queue = %self.name, job_id = %job.id, "Job enqueued");
            Ok(EnqueueOutcome::Enqueued)
        } else {
            debug!(queue = %self.name, job_id = %job.id, "Job already pending");
            Ok(EnqueueOutcome::Duplicate)
        }
    }

    async fn reserve(&self, worker: &str, lease: Duration) -> Result<Option<Delivery>, QueueError> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut conn = self.client.conn_mut();
        let row: Option<ReservedRow> = self
            .reserve
            .key(self.keys.waiting())
            .key(self.keys.active())
            .arg(self.keys.job_prefix())
            .arg(self.keys.lock_prefix())
            .arg(&token)
            .arg(lease.as_millis() as u64)
            .arg(worker)
            .arg(now.timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        let Some((job_id, name, payload, max_attempts, attempt)) = row else {
            return Ok(None);
        };
        let payload = serde_json::from_str(&payload)?;
        Ok(Some(Delivery {
            queue: self.name.clone(),
            job_id,
            name,
            payload,
            attempt,
            max_attempts,
            token,
            reserved_at: now,
        }))
    }

    async fn extend_lease(&self, delivery: &Delivery, lease: Duration) -> Result<(), QueueError> {
        let mut conn = self.client.conn_mut();
        let extended: i64 = self
            .extend
            .key(self.keys.lock(&delivery.job_id))
            .arg(&delivery.token)
            .arg(lease.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        if extended == 1 {
            Ok(())
        } else {
            Err(Self::lease_lost(delivery))
        }
    }

    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.client.conn_mut();
        let done: i64 = self
            .complete
            .key(self.keys.lock(&delivery.job_id))
            .key(self.keys.active())
            .key(self.keys.job(&delivery.job_id))
            .arg(&delivery.token)
            .arg(&delivery.job_id)
            .arg(self.retention_seconds)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        if done == 1 {
            Ok(())
        } else {
            Err(Self::lease_lost(delivery))
        }
    }

    async fn fail(
        &self,
        delivery: &Delivery,
        error: &str,
        retry: bool,
    ) -> Result<FailureDisposition, QueueError> {
        let mut conn = self.client.conn_mut();
        let result: i64 = self
            .fail
            .key(self.keys.lock(&delivery.job_id))
            .key(self.keys.active())
            .key(self.keys.waiting())
            .key(self.keys.failed())
            .key(self.keys.job(&delivery.job_id))
            .arg(&delivery.token)
            .arg(&delivery.job_id)
            .arg(error)
            .arg(if retry { 1 } else { 0 })
            .arg(self.retention_seconds)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        match result {
            1 => Ok(FailureDisposition::Retrying),
            0 => Ok(FailureDisposition::Exhausted),
            _ => Err(Self::lease_lost(delivery)),
        }
    }

    async fn recover_stalled(&self) -> Result<StalledJobs, QueueError> {
        let mut conn = self.client.conn_mut();
        let (requeued, rows): (u64, Vec<StalledRow>) = self
            .recover
            .key(self.keys.active())
            .key(self.keys.waiting())
            .key(self.keys.failed())
            .arg(self.keys.lock_prefix())
            .arg(self.keys.job_prefix())
            .arg(self.retention_seconds)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        let exhausted = rows
            .into_iter()
            .map(|(job_id, name, payload, max_attempts, attempt, reserved_at)| {
                Ok(Delivery {
                    queue: self.name.clone(),
                    job_id,
                    name,
                    payload: serde_json::from_str(&payload)?,
                    attempt,
                    max_attempts,
                    token: String::new(),
                    reserved_at: DateTime::from_timestamp_millis(reserved_at)
                        .unwrap_or_else(Utc::now),
                })
            })
            .collect::<Result<Vec<_>, QueueError>>()?;

        if requeued > 0 {
            warn!(queue = %self.name, requeued, "Returned stalled jobs to the waiting list");
        }
        if !exhausted.is_empty() {
            warn!(
                queue = %self.name,
                failed = exhausted.len(),
                "Moved stalled jobs without attempts left to the failed list"
            );
        }
        Ok(StalledJobs {
            requeued,
            exhausted,
        })
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.client.conn_mut();
        let (waiting, active, failed): (u64, u64, u64) = redis::pipe()
            .cmd("LLEN")
            .arg(self.keys.waiting())
            .cmd("LLEN")
            .arg(self.keys.active())
            .cmd("LLEN")
            .arg(self.keys.failed())
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        Ok(QueueStats {
            waiting,
            active,
            failed,
        })
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.client.conn_mut();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}
