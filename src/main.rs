//! cfgwatch - Azure configuration snapshot watcher
//!
//! CLI entry point: loads configuration, sets up logging, and runs the
//! coordinator until a fatal error or a termination signal.

use std::fs;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use cfgwatch::cli::{Cli, log_path};
use cfgwatch::config::Config;
use cfgwatch::coordinator::Coordinator;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_file_path = log_path();
    if let Some(log_dir) = log_file_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Level priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    // Log to a file so stdout stays clean for snapshot output
    let log_file = fs::File::create(&log_file_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // One line on stderr: {:#} renders the whole context chain inline
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Read just the log level first so logging is up before the full
    // config load emits its diagnostics
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        refresh_interval_secs = config.refresh.interval_secs,
        report_interval_secs = config.report.interval_secs,
        "cfgwatch starting"
    );

    let coordinator = Coordinator::from_env(&config)?;

    if cli.once {
        return run_once(&coordinator).await;
    }

    coordinator.run().await
}

/// Fetch and print a single snapshot, then exit
///
/// Useful as a smoke test for the credential and store access.
async fn run_once(coordinator: &Coordinator) -> Result<()> {
    let snapshot = coordinator.fetch_once().await?;
    println!("{}", snapshot.render());
    Ok(())
}
