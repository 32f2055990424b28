//! Start a report worker.

use std::sync::Arc;

use clap::Args;

use taskhub_core::config::AppConfig;
use taskhub_core::error::AppError;
use taskhub_database::ReportStore;
use taskhub_queue::QueueManager;
use taskhub_render::{ChromiumRenderer, DocumentRenderer, RenderPool};
use taskhub_storage::StorageManager;
use taskhub_worker::alerts::{install_panic_hook, transport_from_config};
use taskhub_worker::{FailureNotifier, JobExecutor, ReportJobHandler, WorkerRunner};

/// Arguments for the worker command
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Override the worker name
    #[arg(long)]
    pub name: Option<String>,

    /// Override the number of concurrent jobs
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Execute the worker command
///
/// Failures after the notifier is up are reported to the administrator
/// before the process exits with status 1.
pub async fn execute(args: WorkerArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(name) = args.name {
        config.worker.name = name;
    }
    if let Some(concurrency) = args.concurrency {
        config.worker.concurrency = concurrency;
    }
    config.worker.name = config.worker.resolved_name();

    let store = super::connect_store(&config).await?;
    let notifier = Arc::new(FailureNotifier::new(
        transport_from_config(&config.notifier)?,
        store.clone(),
        config.notifier.admin_email.clone(),
        config.worker.name.clone(),
        config.queue.name.clone(),
    ));
    install_panic_hook(notifier.clone());

    if let Err(e) = run(&config, store, notifier.clone()).await {
        tracing::error!(error = %e, "Worker failed");
        notifier.process_failure("failed", &e.to_string()).await;
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    config: &AppConfig,
    store: Arc<dyn ReportStore>,
    notifier: Arc<FailureNotifier>,
) -> Result<(), AppError> {
    let queue = QueueManager::new(&config.queue).await?.queue();
    let storage = StorageManager::new(&config.storage).await?.provider();

    let chromium: Arc<dyn DocumentRenderer> =
        Arc::new(ChromiumRenderer::from_config(&config.renderer));
    let renderer: Arc<dyn DocumentRenderer> = Arc::new(RenderPool::new(
        chromium,
        config.renderer.max_concurrent,
    ));

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ReportJobHandler::new(
        store,
        storage,
        renderer,
        &config.worker,
    )));

    let runner = WorkerRunner::new(
        queue,
        Arc::new(executor),
        notifier,
        config.worker.clone(),
        &config.queue,
    );
    runner.run(super::shutdown_channel()).await
}
