//! Daemon configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main cfgwatch configuration
///
/// Covers the daemon's own knobs only; the remote store names and the
/// snapshot field set are compiled in and have no runtime override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Refresh loop configuration
    pub refresh: RefreshConfig,

    /// Report loop configuration
    pub report: ReportConfig,

    /// Log level (TRACE/DEBUG/INFO/WARN/ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit `--config` path, then `.cfgwatch.yml` in the working
    /// directory, then `~/.config/cfgwatch/cfgwatch.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".cfgwatch.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cfgwatch").join("cfgwatch.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, for use before logging is initialized
    ///
    /// Best-effort and silent; the full load with diagnostics happens once
    /// the subscriber is installed.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = Self::resolve_existing_path(config_path)?;
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// First config file present in the fallback chain
    fn resolve_existing_path(config_path: Option<&PathBuf>) -> Option<PathBuf> {
        if let Some(path) = config_path {
            return Some(path.clone());
        }

        let local_config = PathBuf::from(".cfgwatch.yml");
        if local_config.exists() {
            return Some(local_config);
        }

        let user_config = dirs::config_dir()?.join("cfgwatch").join("cfgwatch.yml");
        user_config.exists().then_some(user_config)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Refresh loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Interval between fetches, in seconds
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl RefreshConfig {
    /// Get the refresh interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Report loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Interval between snapshot dumps, in seconds
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl ReportConfig {
    /// Get the report interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
