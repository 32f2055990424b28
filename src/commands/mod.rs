//! CLI command definitions and dispatch.

pub mod enqueue;
pub mod migrate;
pub mod serve;
pub mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;

use taskhub_core::config::AppConfig;
use taskhub_core::error::AppError;
use taskhub_database::{DatabasePool, PgReportStore, ReportStore};

/// TaskHub report pipeline
#[derive(Debug, Parser)]
#[command(name = "taskhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "TASKHUB_CONFIG", default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay, loaded from `config/{env}.toml`
    #[arg(long, global = true, env = "TASKHUB_ENV", default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve(serve::ServeArgs),
    /// Start a report worker
    Worker(worker::WorkerArgs),
    /// Apply database migrations
    Migrate,
    /// Enqueue the job of an existing report
    Enqueue(enqueue::EnqueueArgs),
}

impl Commands {
    /// Subcommand name, for error context
    pub fn name(&self) -> &'static str {
        match self {
            Self::Serve(_) => "serve",
            Self::Worker(_) => "worker",
            Self::Migrate => "migrate",
            Self::Enqueue(_) => "enqueue",
        }
    }
}

/// Execute the CLI command
pub async fn execute(command: Commands, config: AppConfig) -> Result<(), AppError> {
    match command {
        Commands::Serve(args) => serve::execute(args, config).await,
        Commands::Worker(args) => worker::execute(args, config).await,
        Commands::Migrate => migrate::execute(config).await,
        Commands::Enqueue(args) => enqueue::execute(args, config).await,
    }
}

/// Helper: connect to the database and wrap it in a report store
pub(crate) async fn connect_store(config: &AppConfig) -> Result<Arc<dyn ReportStore>, AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    Ok(Arc::new(PgReportStore::new(db)))
}

/// Helper: a channel flipped to `true` on Ctrl+C or SIGTERM
pub(crate) fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = tx.send(true);
    });
    rx
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
