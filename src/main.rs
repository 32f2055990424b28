//! TaskHub report pipeline
//!
//! Single binary that runs either the HTTP API or the report worker.

mod commands;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use taskhub_core::config::AppConfig;

use crate::commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config, &cli.env)
        .with_context(|| format!("Failed to load configuration from '{}'", cli.config))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        tracing::error!(error = %format!("{e:#}"), "TaskHub exited with an error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        config = %cli.config,
        env = %cli.env,
        "Starting TaskHub v{}",
        env!("CARGO_PKG_VERSION")
    );

    let name = cli.command.name();
    commands::execute(cli.command, config)
        .await
        .with_context(|| format!("'{name}' command failed"))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
