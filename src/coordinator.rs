//! Coordinator: bootstraps shared state and supervises the two loops

use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::credential::EnvCredential;
use crate::refresher::Refresher;
use crate::remote::{AzureSource, ConfigSource};
use crate::reporter::Reporter;
use crate::snapshot::SharedSnapshot;

/// Handle for triggering the shared cancellation signal
///
/// Held by the signal watcher and by any task that needs to stop the whole
/// daemon; both loops subscribe to the same channel.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Trigger shutdown; both loops observe it at their next select point
    ///
    /// send_replace stores the value even when no loop has subscribed yet,
    /// so a trigger racing startup is not lost.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// The Coordinator owns the shared snapshot and the shutdown channel, and
/// runs the Refresher and Reporter to completion.
///
/// The first task error (there is no local recovery anywhere) becomes the
/// overall result; cancellation with no error is success.
pub struct Coordinator {
    source: Arc<dyn ConfigSource>,
    shared: SharedSnapshot,
    shutdown_tx: Arc<watch::Sender<bool>>,
    refresh_interval: Duration,
    report_interval: Duration,
}

impl Coordinator {
    /// Create a Coordinator against the real remote stores
    ///
    /// Resolves the ambient credential first; failure here is fatal and no
    /// loop is started.
    pub fn from_env(config: &Config) -> Result<Self> {
        let credential = EnvCredential::from_env().context("Failed to create credential")?;
        let source = Arc::new(AzureSource::new(Arc::new(credential)));
        Ok(Self::with_source(
            source,
            config.refresh.interval(),
            config.report.interval(),
        ))
    }

    /// Create a Coordinator with an explicit snapshot source
    pub fn with_source(source: Arc<dyn ConfigSource>, refresh_interval: Duration, report_interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            source,
            shared: SharedSnapshot::new(),
            shutdown_tx: Arc::new(shutdown_tx),
            refresh_interval,
            report_interval,
        }
    }

    /// The shared snapshot cell
    pub fn shared(&self) -> SharedSnapshot {
        self.shared.clone()
    }

    /// A handle for triggering shutdown externally
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Perform a single fetch-and-install, returning the new snapshot
    ///
    /// Backs the `--once` smoke-test mode; the loops are never started.
    pub async fn fetch_once(&self) -> Result<crate::snapshot::Snapshot> {
        let snapshot = self.source.fetch().await.context("Failed to refresh config")?;
        self.shared.replace(snapshot.clone()).await;
        Ok(snapshot)
    }

    /// Run both loops until shutdown or the first failure
    ///
    /// Each loop that exits with an error trips the shared shutdown channel,
    /// so its sibling stops within one interval. SIGINT/SIGTERM trip the
    /// same channel.
    pub async fn run(self) -> Result<()> {
        let refresher = Refresher::new(self.source.clone(), self.shared.clone(), self.refresh_interval);
        let reporter = Reporter::new(self.shared.clone(), self.report_interval);

        let refresher_handle = {
            let shutdown_tx = self.shutdown_tx.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                let result = refresher.run(shutdown_rx).await;
                if result.is_err() {
                    shutdown_tx.send_replace(true);
                }
                result
            })
        };

        let reporter_handle = {
            let shutdown_tx = self.shutdown_tx.clone();
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                let result = reporter.run(shutdown_rx).await;
                if result.is_err() {
                    shutdown_tx.send_replace(true);
                }
                result
            })
        };

        let signal_handle = tokio::spawn(watch_signals(self.shutdown_handle()));

        info!("Coordinator running. Press Ctrl+C to stop.");

        let (refresher_result, reporter_result) = tokio::join!(refresher_handle, reporter_handle);
        signal_handle.abort();

        info!("Coordinator shutting down");

        for joined in [refresher_result, reporter_result] {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(eyre::eyre!("Task panicked: {}", e)),
            }
        }

        Ok(())
    }
}

/// Translate process termination signals into the shared shutdown signal
async fn watch_signals(shutdown: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
            warn!("Failed to install SIGINT handler");
            return;
        };
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            warn!("Failed to install SIGTERM handler");
            return;
        };

        tokio::select! {
            _ = sigint.recv() => {
                warn!("SIGINT received");
            }
            _ = sigterm.recv() => {
                warn!("SIGTERM received");
            }
        }
        shutdown.trigger();
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received");
            shutdown.trigger();
        }
    }
}
