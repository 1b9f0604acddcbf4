//! Integration tests for cfgwatch
//!
//! These tests verify end-to-end behavior of the coordinator and its two
//! loops against mock snapshot sources, plus the binary's startup contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use cfgwatch::coordinator::Coordinator;
use cfgwatch::remote::{ConfigSource, FetchError};
use cfgwatch::snapshot::Snapshot;

// =============================================================================
// Mock sources
// =============================================================================

/// Returns a fixed snapshot and counts fetches
struct CountingSource {
    snapshot: Snapshot,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConfigSource for CountingSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.clone())
    }
}

/// Succeeds a fixed number of times, then fails
struct EventuallyFailingSource {
    good: Snapshot,
    successes: usize,
    fetches: AtomicUsize,
}

#[async_trait]
impl ConfigSource for EventuallyFailingSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        if n < self.successes {
            Ok(self.good.clone())
        } else {
            Err(FetchError::Status {
                resource: "secret ze-kv-foo".to_string(),
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }
}

fn sample() -> Snapshot {
    Snapshot {
        key_vault_foo: "a".to_string(),
        key_vault_bar: "b".to_string(),
        app_config_foo: "c".to_string(),
        app_config_bar: "d".to_string(),
    }
}

// =============================================================================
// Coordinator end-to-end
// =============================================================================

#[tokio::test]
async fn test_clean_shutdown_after_refreshes() {
    let source = Arc::new(CountingSource::new(sample()));
    let coordinator = Coordinator::with_source(source.clone(), Duration::from_millis(10), Duration::from_millis(10));
    let shared = coordinator.shared();
    let shutdown = coordinator.shutdown_handle();

    let handle = tokio::spawn(coordinator.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("both loops should stop within one interval")
        .expect("task should not panic");
    assert!(result.is_ok(), "clean shutdown must not be an error");

    assert!(source.fetches.load(Ordering::SeqCst) >= 2);
    assert_eq!(shared.read().await, sample());
}

#[tokio::test]
async fn test_readers_never_see_partial_snapshot() {
    // A source whose snapshots are uniform per generation; any mixed-field
    // observation would mean a torn read through the shared cell.
    struct GenerationSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ConfigSource for GenerationSource {
        async fn fetch(&self) -> Result<Snapshot, FetchError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            let v = format!("gen-{}", n);
            Ok(Snapshot::from_values([v.clone(), v.clone(), v.clone(), v]))
        }
    }

    let source = Arc::new(GenerationSource {
        fetches: AtomicUsize::new(0),
    });
    let coordinator = Coordinator::with_source(source, Duration::from_millis(5), Duration::from_secs(60));
    let shared = coordinator.shared();
    let shutdown = coordinator.shutdown_handle();

    let handle = tokio::spawn(coordinator.run());

    for _ in 0..200 {
        let snapshot = shared.read().await;
        let values = snapshot.values();
        assert!(
            values.iter().all(|v| *v == values[0]),
            "torn read observed: {:?}",
            values
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
}

#[tokio::test]
async fn test_fetch_failure_stops_everything_with_error() {
    let source = Arc::new(EventuallyFailingSource {
        good: sample(),
        successes: 2,
        fetches: AtomicUsize::new(0),
    });
    let coordinator = Coordinator::with_source(source, Duration::from_millis(10), Duration::from_secs(60));
    let shared = coordinator.shared();

    // The reporter's interval is 60s; run() returning at all proves the
    // refresher's failure cancelled it rather than waiting for its timer.
    let result = tokio::time::timeout(Duration::from_secs(2), coordinator.run())
        .await
        .expect("fetch failure should stop both loops promptly");

    let err = result.expect_err("fetch failure must surface as the overall error");
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to refresh config"), "got: {}", message);
    assert!(message.contains("503"), "got: {}", message);

    // The last successful snapshot is still the visible one
    assert_eq!(shared.read().await, sample());
}

#[tokio::test]
async fn test_fetch_once_installs_and_returns_snapshot() {
    let source = Arc::new(CountingSource::new(sample()));
    let coordinator = Coordinator::with_source(source.clone(), Duration::from_secs(5), Duration::from_secs(5));

    let snapshot = coordinator.fetch_once().await.unwrap();
    assert_eq!(snapshot, sample());
    assert_eq!(coordinator.shared().read().await, sample());
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Binary startup contract
// =============================================================================

mod binary {
    use assert_cmd::Command;
    use predicates::prelude::*;

    /// Startup credential failure: exit 1, a single error line on stderr,
    /// nothing on stdout
    #[test]
    fn test_missing_credential_env_is_fatal() {
        let mut cmd = Command::cargo_bin("cfgwatch").expect("binary should build");
        cmd.env_remove("AZURE_TENANT_ID")
            .env_remove("AZURE_CLIENT_ID")
            .env_remove("AZURE_CLIENT_SECRET")
            .timeout(std::time::Duration::from_secs(30));

        let assert = cmd
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Failed to create credential"))
            .stdout(predicate::str::is_empty());

        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines.len(), 1, "expected a single error line, got:\n{}", stderr);
    }

    #[test]
    fn test_help_mentions_once_flag() {
        let mut cmd = Command::cargo_bin("cfgwatch").expect("binary should build");
        cmd.arg("--help");

        cmd.assert()
            .success()
            .stdout(predicate::str::contains("--once"));
    }
}
