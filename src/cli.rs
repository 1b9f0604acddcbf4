//! CLI definitions

use std::path::PathBuf;

use clap::Parser;

/// cfgwatch - Azure configuration snapshot watcher
#[derive(Debug, Parser)]
#[command(
    name = "cfgwatch",
    about = "Watches a Key Vault and an App Configuration store, printing periodic config snapshots",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/cfgwatch/logs/cfgwatch.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE/DEBUG/INFO/WARN/ERROR)
    #[arg(short, long, help = "Log level")]
    pub log_level: Option<String>,

    /// Fetch and print one snapshot, then exit
    #[arg(long, help = "Fetch and print a single snapshot, then exit")]
    pub once: bool,
}

/// Default log file path, for display and for the subscriber writer
pub fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cfgwatch")
        .join("logs")
        .join("cfgwatch.log")
}
