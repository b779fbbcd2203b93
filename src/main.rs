// PII Process - PII detection and transformation pipeline
// Copyright (c) 2025 PII Process Contributors
// Licensed under the MIT License

use pii_process::cli::{Cli, Commands};
use pii_process::config::LoggingConfig;
use pii_process::domain::{PiiProcessError, Stage};
use pii_process::logging::init_logging;
use clap::Parser;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console logging on stderr; rolling JSON files only with --log-dir
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let logging_config = match &cli.log_dir {
        Some(dir) => LoggingConfig::to_dir(dir.display().to_string()),
        None => LoggingConfig::default(),
    };
    let guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(2);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "pii-process - PII detection and transformation"
    );

    // Create shutdown signal channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), stopping after the current record...");
                    let _ = shutdown_tx.send(true);
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, stopping after the current record...");
                    let _ = shutdown_tx.send(true);
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), stopping after the current record...");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => report(&e),
    };

    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Doc(args) => args.execute().await,
        Commands::Jsonl(args) => args.execute(shutdown_signal).await,
        Commands::Tasks(args) => args.execute().await,
        Commands::ValidateConfig(args) => args.execute().await,
    }
}

/// Prints a failed command and returns its exit code
fn report(error: &anyhow::Error) -> i32 {
    tracing::error!(error = %error, "Command execution failed");
    match error.downcast_ref::<PiiProcessError>() {
        Some(e) => {
            eprintln!("Error [{}]: {e}", e.stage());
            match e.stage() {
                Stage::Config => 2,
                Stage::Interrupt => 130,
                _ => 1,
            }
        }
        None => {
            eprintln!("Error: {error:#}");
            1
        }
    }
}
