//! Worker runner: main loop that reserves jobs and executes them.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use taskhub_core::config::{QueueConfig, WorkerConfig};
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::queue::{
    Delivery, FailureDisposition, JobQueue, QueueError, stalled_error,
};

use crate::alerts::{ConnectionEvent, ConnectionSupervisor, FailureNotifier, panic_message};
use crate::executor::{JobExecutionError, JobExecutor};

/// Shortest interval between lease extensions.
const MIN_LEASE_TICK: Duration = Duration::from_millis(100);

fn connection_event(err: &QueueError) -> ConnectionEvent {
    ConnectionEvent::Error {
        refused: err.is_connection_refused(),
        message: err.to_string(),
    }
}

/// Everything a spawned job task needs.
#[derive(Debug, Clone)]
struct JobTask {
    queue: Arc<dyn JobQueue>,
    executor: Arc<JobExecutor>,
    notifier: Arc<FailureNotifier>,
    lease: Duration,
}

impl JobTask {
    /// Run one delivery to its end: execute, then complete or fail it.
    async fn process(self, delivery: Delivery) {
        let keeper = tokio::spawn(keep_lease(
            self.queue.clone(),
            delivery.clone(),
            self.lease,
        ));
        let result = AssertUnwindSafe(self.executor.execute(&delivery))
            .catch_unwind()
            .await;
        keeper.abort();

        match result {
            Ok(Ok(())) => match self.queue.complete(&delivery).await {
                Ok(()) => info!("Job completed"),
                Err(e @ QueueError::LeaseLost { .. }) => {
                    self.notifier.lease_lost(&delivery, &e.to_string()).await;
                }
                Err(e) => error!(error = %e, "Failed to acknowledge job"),
            },
            Ok(Err(err)) => {
                let message = err.message();
                match &err {
                    JobExecutionError::Permanent(_) => error!(error = %message, "Job failed permanently"),
                    JobExecutionError::Transient(_) => warn!(error = %message, "Job failed"),
                    JobExecutionError::Internal(_) => error!(error = %message, "Job internal error"),
                }
                if self.fail(&delivery, &message, err.is_retryable(), true).await {
                    self.notifier.job_failed(&delivery, &message).await;
                }
            }
            Err(panic) => {
                let message = format!("Job panicked: {}", panic_message(&*panic));
                error!(error = %message, "Job task panicked");
                self.executor.abandon(&delivery, &message).await;
                self.notifier.job_panicked(&delivery, &message).await;
                self.fail(&delivery, &message, false, false).await;
            }
        }
    }

    /// Record a failure in the queue. Returns `true` when the job will not
    /// be attempted again and nobody has been alerted yet.
    ///
    /// A lost lease is alerted only with `alert_lease_loss`; the panic path
    /// has already sent its alert.
    async fn fail(
        &self,
        delivery: &Delivery,
        message: &str,
        retry: bool,
        alert_lease_loss: bool,
    ) -> bool {
        match self.queue.fail(delivery, message, retry).await {
            Ok(FailureDisposition::Retrying) => {
                info!(
                    attempt = delivery.attempt,
                    max_attempts = delivery.max_attempts,
                    "Job scheduled for retry"
                );
                false
            }
            Ok(FailureDisposition::Exhausted) => true,
            Err(e @ QueueError::LeaseLost { .. }) => {
                let detail = format!("{e}; job error: {message}");
                if alert_lease_loss {
                    self.notifier.lease_lost(delivery, &detail).await;
                } else {
                    warn!(error = %detail, "Lease lost while recording an alerted failure");
                }
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to record job failure");
                true
            }
        }
    }
}

/// Extend the lease of `delivery` until aborted or the lease is lost.
async fn keep_lease(queue: Arc<dyn JobQueue>, delivery: Delivery, lease: Duration) {
    let mut ticker = time::interval((lease / 3).max(MIN_LEASE_TICK));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match queue.extend_lease(&delivery, lease).await {
            Ok(()) => trace!(job_id = %delivery.job_id, "Lease extended"),
            Err(e @ QueueError::LeaseLost { .. }) => {
                warn!(job_id = %delivery.job_id, error = %e, "Lease lost while processing");
                return;
            }
            Err(e) => warn!(job_id = %delivery.job_id, error = %e, "Failed to extend lease"),
        }
    }
}

/// Main worker runner that reserves jobs and executes them.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Report queue.
    queue: Arc<dyn JobQueue>,
    /// Job executor for dispatching.
    executor: Arc<JobExecutor>,
    /// Alerts.
    notifier: Arc<FailureNotifier>,
    /// Worker configuration.
    config: WorkerConfig,
    /// Worker identifier used for reservations.
    worker_name: String,
    /// Lease granted per reservation.
    lease: Duration,
    /// Interval of the stalled-job sweep.
    stall_check: Duration,
    /// Queue connection state.
    supervisor: Mutex<ConnectionSupervisor>,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(
        queue: Arc<dyn JobQueue>,
        executor: Arc<JobExecutor>,
        notifier: Arc<FailureNotifier>,
        config: WorkerConfig,
        queue_config: &QueueConfig,
    ) -> Self {
        Self {
            worker_name: notifier.worker_name().to_string(),
            queue,
            executor,
            notifier,
            config,
            lease: Duration::from_secs(queue_config.lease_seconds.max(1)),
            stall_check: Duration::from_secs(queue_config.stall_check_seconds.max(1)),
            supervisor: Mutex::new(ConnectionSupervisor::new()),
        }
    }

    fn task(&self) -> JobTask {
        JobTask {
            queue: self.queue.clone(),
            executor: self.executor.clone(),
            notifier: self.notifier.clone(),
            lease: self.lease,
        }
    }

    fn span(&self, delivery: &Delivery) -> tracing::Span {
        info_span!(
            "job",
            worker = %self.worker_name,
            job.id = %delivery.job_id,
            job.name = %delivery.name,
            attempt = delivery.attempt
        )
    }

    /// Reserve one job and process it inline. Returns whether a job was
    /// found.
    pub async fn run_once(&self) -> AppResult<bool> {
        match self.queue.reserve(&self.worker_name, self.lease).await {
            Ok(Some(delivery)) => {
                let span = self.span(&delivery);
                self.task().process(delivery).instrument(span).await;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                self.observe(connection_event(&e)).await;
                Err(AppError::from(e))
            }
        }
    }

    /// Probe the queue backend and feed the result to the supervisor.
    pub async fn probe(&self) {
        let event = match self.queue.ping().await {
            Ok(()) => ConnectionEvent::Ready,
            Err(e) => connection_event(&e),
        };
        self.observe(event).await;
    }

    async fn observe(&self, event: ConnectionEvent) {
        let signal = match self.supervisor.lock() {
            Ok(mut supervisor) => supervisor.observe(event),
            Err(poisoned) => poisoned.into_inner().observe(event),
        };
        if let Some(signal) = signal {
            self.notifier.connection_changed(&signal).await;
        }
    }

    /// Sweep expired leases. Jobs the queue gave up on are failed and
    /// alerted here, since no worker task is left to do it.
    pub async fn sweep(&self) {
        let stalled = match self.queue.recover_stalled().await {
            Ok(stalled) => stalled,
            Err(e) => {
                debug!(error = %e, "Stalled job sweep failed");
                return;
            }
        };
        if stalled.requeued > 0 {
            warn!(requeued = stalled.requeued, "Returned stalled jobs to the queue");
        } else if stalled.exhausted.is_empty() {
            trace!("No stalled jobs");
        }

        for delivery in &stalled.exhausted {
            let message = stalled_error(delivery.attempt, delivery.max_attempts);
            async {
                error!(error = %message, "Stalled job has no attempts left");
                self.executor.abandon(delivery, &message).await;
                self.notifier.job_stalled(delivery, &message).await;
            }
            .instrument(self.span(delivery))
            .await;
        }
    }

    /// Run until the cancel signal is received.
    ///
    /// Fails only when the queue is unreachable at startup.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> AppResult<()> {
        self.queue.ping().await.map_err(|e| {
            AppError::service_unavailable(format!("Queue '{}' unreachable: {e}", self.queue.name()))
        })?;

        let concurrency = self.config.concurrency.max(1);
        info!(
            worker = %self.worker_name,
            queue = %self.queue.name(),
            concurrency,
            user_concurrency = self.config.user_concurrency,
            poll_interval = self.config.poll_interval_seconds,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));
        let mut probe = time::interval(Duration::from_secs(
            self.config.health_probe_seconds.max(1),
        ));
        probe.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sweep = time::interval(self.stall_check);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!(worker = %self.worker_name, "Worker received shutdown signal");
                        break;
                    }
                }
                _ = probe.tick() => self.probe().await,
                _ = sweep.tick() => self.sweep().await,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Job task ended abnormally");
                    }
                }
                permit = semaphore.clone().acquire_owned() => {
                    let Ok(permit) = permit else { break };
                    match self.queue.reserve(&self.worker_name, self.lease).await {
                        Ok(Some(delivery)) => {
                            let span = self.span(&delivery);
                            let task = self.task();
                            tasks.spawn(
                                async move {
                                    let _permit = permit;
                                    task.process(delivery).await;
                                }
                                .instrument(span),
                            );
                            continue;
                        }
                        Ok(None) => trace!("No jobs available"),
                        Err(e) => {
                            error!(error = %e, "Failed to reserve job");
                            self.observe(connection_event(&e)).await;
                        }
                    }
                    drop(permit);
                    tokio::select! {
                        changed = cancel.changed() => {
                            if changed.is_err() || *cancel.borrow() {
                                info!(worker = %self.worker_name, "Worker received shutdown signal");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        info!(
            worker = %self.worker_name,
            in_flight = tasks.len(),
            "Waiting for in-flight jobs to complete"
        );
        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
        let drained = time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                "Shutdown grace period elapsed; abandoning jobs to lease expiry"
            );
            tasks.abort_all();
        }

        info!(worker = %self.worker_name, "Worker shut down complete");
        Ok(())
    }
}
