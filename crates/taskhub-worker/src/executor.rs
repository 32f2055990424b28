//! Job executor: dispatches deliveries to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::traits::queue::Delivery;

/// Trait for job handler implementations.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Job name this handler processes.
    fn job_name(&self) -> &str;

    /// Execute the job.
    async fn execute(&self, delivery: &Delivery) -> Result<(), JobExecutionError>;

    /// Called when the job ended without `execute` returning, e.g. after a
    /// panic, so the handler can record the failure on its own records.
    async fn on_abandoned(&self, _delivery: &Delivery, _reason: &str) {}
}

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, never retried.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, retried while attempts remain.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Classify an application error by its kind.
    pub fn from_app_error(err: AppError) -> Self {
        match err.kind {
            ErrorKind::NotFound
            | ErrorKind::Authorization
            | ErrorKind::Validation
            | ErrorKind::Serialization => Self::Permanent(err.message),
            ErrorKind::Internal => Self::Internal(err),
            _ => Self::Transient(err.message),
        }
    }

    /// Whether the queue may schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Message recorded on the job and sent in alerts.
    pub fn message(&self) -> String {
        match self {
            Self::Permanent(msg) | Self::Transient(msg) => msg.clone(),
            Self::Internal(err) => err.to_string(),
        }
    }
}

/// Dispatches deliveries to the handler registered for their job name.
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by name.
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let name = handler.job_name().to_string();
        info!(job_name = %name, "Registered job handler");
        self.handlers.insert(name, handler);
    }

    /// Execute a delivery by dispatching to the correct handler.
    pub async fn execute(&self, delivery: &Delivery) -> Result<(), JobExecutionError> {
        let handler = self.handlers.get(&delivery.name).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job '{}'",
                delivery.name
            ))
        })?;

        info!(
            job_id = %delivery.job_id,
            job_name = %delivery.name,
            attempt = delivery.attempt,
            max_attempts = delivery.max_attempts,
            "Executing job"
        );

        handler.execute(delivery).await
    }

    /// Let the handler of `delivery` record an abandoned run.
    pub async fn abandon(&self, delivery: &Delivery, reason: &str) {
        match self.handlers.get(&delivery.name) {
            Some(handler) => handler.on_abandoned(delivery, reason).await,
            None => warn!(job_name = %delivery.name, "No handler to record abandoned job"),
        }
    }
}
