//! Enqueue the job of an existing report.

use clap::Args;

use taskhub_core::config::AppConfig;
use taskhub_core::error::AppError;
use taskhub_core::traits::queue::EnqueueOutcome;
use taskhub_core::types::ReportId;
use taskhub_queue::QueueManager;
use taskhub_service::ReportService;

/// Arguments for the enqueue command
#[derive(Debug, Args)]
pub struct EnqueueArgs {
    /// Report to (re)generate; a FAILED report is reset to GENERATING
    pub report_id: String,
}

/// Execute the enqueue command
pub async fn execute(args: EnqueueArgs, config: AppConfig) -> Result<(), AppError> {
    let id: ReportId = args
        .report_id
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid report id '{}': {e}", args.report_id)))?;

    let store = super::connect_store(&config).await?;
    let queue = QueueManager::new(&config.queue).await?.queue();
    let service = ReportService::new(store, queue, config.queue.max_attempts);

    match service.requeue(id).await? {
        EnqueueOutcome::Enqueued => println!("Report {id} enqueued."),
        EnqueueOutcome::Duplicate => println!("Report {id} already has a pending job."),
    }
    Ok(())
}
