//! Queue manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use taskhub_core::config::QueueConfig;
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::queue::{
    Delivery, EnqueueOutcome, FailureDisposition, JobQueue, NewJob, QueueError, QueueStats,
    StalledJobs,
};

/// Queue manager that wraps the configured [`JobQueue`] backend.
#[derive(Debug, Clone)]
pub struct QueueManager {
    inner: Arc<dyn JobQueue>,
}

impl QueueManager {
    /// Create a queue manager from configuration.
    pub async fn new(config: &QueueConfig) -> AppResult<Self> {
        let inner: Arc<dyn JobQueue> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!(queue = %config.name, "Initializing Redis job queue");
                let client = crate::redis::RedisClient::connect(&config.url).await?;
                Arc::new(crate::redis::RedisJobQueue::new(
                    client,
                    &config.key_prefix,
                    &config.name,
                    config.retention_seconds,
                ))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(queue = %config.name, "Initializing in-memory job queue");
                Arc::new(crate::memory::MemoryJobQueue::new(&config.name))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a queue manager from an existing backend (for testing).
    pub fn from_queue(queue: Arc<dyn JobQueue>) -> Self {
        Self { inner: queue }
    }

    /// Shared handle to the backend.
    pub fn queue(&self) -> Arc<dyn JobQueue> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl JobQueue for QueueManager {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn enqueue(&self, job: NewJob) -> Result<EnqueueOutcome, QueueError> {
        self.inner.enqueue(job).await
    }

    async fn reserve(&self, worker: &str, lease: Duration) -> Result<Option<Delivery>, QueueError> {
        self.inner.reserve(worker, lease).await
    }

    async fn extend_lease(&self, delivery: &Delivery, lease: Duration) -> Result<(), QueueError> {
        self.inner.extend_lease(delivery, lease).await
    }

    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.inner.complete(delivery).await
    }

    async fn fail(
        &self,
        delivery: &Delivery,
        error: &str,
        retry: bool,
    ) -> Result<FailureDisposition, QueueError> {
        self.inner.fail(delivery, error, retry).await
    }

    async fn recover_stalled(&self) -> Result<StalledJobs, QueueError> {
        self.inner.recover_stalled().await
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.inner.stats().await
    }

    async fn ping(&self) -> Result<(), QueueError> {
        self.inner.ping().await
    }
}
