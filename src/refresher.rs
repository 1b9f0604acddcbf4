//! Refresh loop: periodically replaces the shared snapshot from the remote source

use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::remote::ConfigSource;
use crate::snapshot::SharedSnapshot;

/// The Refresher fetches a brand-new snapshot on a fixed interval and
/// installs it as current.
///
/// A fetch failure ends the loop with an error; there is no retry. The
/// caller treats that error as fatal and cancels the sibling loop.
pub struct Refresher {
    source: Arc<dyn ConfigSource>,
    shared: SharedSnapshot,
    interval: Duration,
}

impl Refresher {
    /// Create a new Refresher
    pub fn new(source: Arc<dyn ConfigSource>, shared: SharedSnapshot, interval: Duration) -> Self {
        Self {
            source,
            shared,
            interval,
        }
    }

    /// Perform one fetch-and-replace cycle
    pub async fn refresh_once(&self) -> Result<()> {
        let snapshot = self.source.fetch().await.context("Failed to refresh config")?;
        self.shared.replace(snapshot).await;
        debug!("Refresher: snapshot replaced");
        Ok(())
    }

    /// Run the refresh loop until shutdown or fetch failure
    ///
    /// The first fetch happens one full interval after start; until then
    /// readers see the initial empty snapshot.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        info!(interval_secs = self.interval.as_secs(), "Refresher started");

        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        // A fetch can outlast the interval; don't burst to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // wait_for observes an already-triggered shutdown too; the
                // async block drops its read guard so run() stays Send
                _ = async { let _ = shutdown_rx.wait_for(|stop| *stop).await; } => {
                    info!("Refresher: shutdown signal received");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.refresh_once().await?;
                }
            }
        }
    }
}
