//! End-to-end runs of the harness against test stores.

use rate_bench::application::shutdown::{spawn_timeout_watchdog, ShutdownReason};
use rate_bench::infrastructure::mocks::{MockClock, ScriptedStore};
use rate_bench::{
    ExitHook, Harness, HarnessConfig, HarnessError, InMemoryStore, MetricsSnapshot,
    SnapshotFormatter,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn silent() -> SnapshotFormatter {
    Arc::new(|_: &MetricsSnapshot| {})
}

#[tokio::test]
async fn test_memory_run_drops_namespace() {
    let store = Arc::new(InMemoryStore::default());
    let harness = Harness::new(HarnessConfig::new(50, 20), store.clone())
        .unwrap()
        .with_clock(Arc::new(MockClock::new(Instant::now())))
        .with_formatter(silent());

    let summary = harness.run().await.unwrap();

    assert_eq!(summary.requests_sent, 50);
    assert_eq!(summary.processed, 20);
    assert_eq!(summary.throttled, 30);
    assert_eq!(summary.failed, 0);
    assert!(summary.average_latency.is_some());
    assert!(store.is_empty());
    assert!(!store.is_provisioned());
}

#[tokio::test]
async fn test_memory_run_keeps_rows_without_drop() {
    let store = Arc::new(InMemoryStore::default());
    let mut config = HarnessConfig::new(10, 10);
    config.drop_after = false;
    let harness = Harness::new(config, store.clone())
        .unwrap()
        .with_formatter(silent());

    let summary = harness.run().await.unwrap();

    assert_eq!(summary.processed, 10);
    assert!(store.is_provisioned());
    assert!(!store.is_empty());
}

#[tokio::test]
async fn test_provision_error_surfaces() {
    let store = Arc::new(ScriptedStore::succeeding().with_provision_failure());
    let harness = Harness::new(HarnessConfig::new(10, 10), store)
        .unwrap()
        .with_formatter(silent());

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::Provision(_)));
    assert!(err.to_string().starts_with("provisioning error"));
}

#[tokio::test(start_paused = true)]
async fn test_process_timeout_cleans_up_once() {
    let store = Arc::new(ScriptedStore::succeeding().with_latency(Duration::from_secs(10)));
    let mut config = HarnessConfig::new(2, 2);
    config.report_interval = Duration::from_secs(1);
    let harness = Arc::new(
        Harness::new(config, store.clone())
            .unwrap()
            .with_formatter(silent()),
    );

    let fired = Arc::new(Mutex::new(Vec::new()));
    let fired_clone = Arc::clone(&fired);
    let exit: ExitHook = Arc::new(move |reason: ShutdownReason| {
        fired_clone.lock().unwrap().push(reason)
    });
    let watchdog = spawn_timeout_watchdog(harness.coordinator(), Duration::from_secs(3), exit);

    let run = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.run().await })
    };

    watchdog.await.unwrap();
    assert_eq!(*fired.lock().unwrap(), vec![ShutdownReason::ProcessTimeout]);

    // The run still finishes on its own; cleanup must not repeat.
    run.await.unwrap().unwrap();
    assert_eq!(store.teardowns(), 1);
}
