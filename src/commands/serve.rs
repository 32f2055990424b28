//! Start the HTTP API.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use taskhub_api::{AppState, build_router};
use taskhub_auth::JwtDecoder;
use taskhub_core::config::AppConfig;
use taskhub_core::error::{AppError, ErrorKind};
use taskhub_database::{DatabasePool, PgReportStore, ReportStore};
use taskhub_queue::QueueManager;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Skip database migrations on startup
    #[arg(long)]
    pub no_migrate: bool,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    if config.server.migrate_on_start && !args.no_migrate {
        taskhub_database::migration::run_migrations(db.pool()).await?;
    }
    let store: Arc<dyn ReportStore> = Arc::new(PgReportStore::new(db.clone()));

    let queue = QueueManager::new(&config.queue).await?.queue();
    let state = AppState::new(
        store,
        queue,
        JwtDecoder::new(&config.auth),
        config.queue.max_attempts,
    );
    let app = build_router(state, &config.server.cors);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}: {e}"), e)
    })?;
    tracing::info!(address = %addr, "HTTP API listening");

    let shutdown = super::shutdown_channel();
    let mut drain = shutdown.clone();
    let mut deadline = shutdown;
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = drain.wait_for(|stop| *stop).await;
    })
    .into_future();
    tokio::select! {
        result = server => result.map_err(|e| {
            AppError::with_source(ErrorKind::Internal, format!("Server error: {e}"), e)
        })?,
        _ = async move {
            let _ = deadline.wait_for(|stop| *stop).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "Shutdown grace period elapsed; dropping open connections"
            );
        }
    }

    db.close().await;
    tracing::info!("HTTP API shut down");
    Ok(())
}
