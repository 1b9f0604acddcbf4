//! Report loop: periodically renders the current snapshot to stdout

use std::time::Duration;

use eyre::Result;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::snapshot::SharedSnapshot;

/// The Reporter dumps the current snapshot on a fixed interval.
///
/// It only reads shared state and has no failure mode other than
/// cancellation.
pub struct Reporter {
    shared: SharedSnapshot,
    interval: Duration,
}

impl Reporter {
    /// Create a new Reporter
    pub fn new(shared: SharedSnapshot, interval: Duration) -> Self {
        Self { shared, interval }
    }

    /// Render the current snapshot
    pub async fn report_once(&self) -> String {
        self.shared.read().await.render()
    }

    /// Run the report loop until shutdown
    ///
    /// Ticks on its own timer, independent of the refresh loop's schedule.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        info!(interval_secs = self.interval.as_secs(), "Reporter started");

        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);

        loop {
            tokio::select! {
                // wait_for observes an already-triggered shutdown too; the
                // async block drops its read guard so run() stays Send
                _ = async { let _ = shutdown_rx.wait_for(|stop| *stop).await; } => {
                    info!("Reporter: shutdown signal received");
                    return Ok(());
                }
                _ = interval.tick() => {
                    let rendered = self.report_once().await;
                    println!("{}", rendered);
                    debug!("Reporter: snapshot emitted");
                }
            }
        }
    }
}
