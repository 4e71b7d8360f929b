//! Lock-free latency and throughput metrics.
//!
//! Workers add to shared counters with `fetch_add`; nothing ever blocks on
//! another writer. Readers take snapshots for reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Metrics aggregated across all workers of a run.
///
/// Cloning is cheap and every clone shares the same counters, so one
/// instance is constructed per run and handed to each worker.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Sum of counted latencies in nanoseconds
    total_latency_nanos: AtomicU64,
    /// Number of attempts whose latency was counted
    completed: AtomicU64,
    /// Number of workers rejected by the rate limiter
    throttled: AtomicU64,
    /// Number of admitted writes that failed
    failed: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                total_latency_nanos: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                throttled: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    /// Record a completed attempt and its latency.
    pub fn record_completion(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.inner
            .total_latency_nanos
            .fetch_add(nanos, Ordering::Relaxed);
        self.inner.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a worker rejected by the rate limiter.
    pub fn record_throttle(&self) {
        self.inner.throttled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed write.
    pub fn record_failure(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of completed attempts.
    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    /// Get the number of throttled workers.
    pub fn throttled(&self) -> u64 {
        self.inner.throttled.load(Ordering::Relaxed)
    }

    /// Get the number of failed writes.
    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::Relaxed)
    }

    /// Get the accumulated latency of completed attempts.
    pub fn total_latency(&self) -> Duration {
        Duration::from_nanos(self.inner.total_latency_nanos.load(Ordering::Relaxed))
    }

    /// Average latency of completed attempts, or `None` before the first one.
    pub fn average_latency(&self) -> Option<Duration> {
        average(self.total_latency(), self.completed())
    }

    /// Get a snapshot of all metrics.
    ///
    /// Counters are loaded one at a time, so under concurrent updates the
    /// count and the total may come from slightly different instants.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.completed();
        let total_latency = self.total_latency();
        MetricsSnapshot {
            completed,
            throttled: self.throttled(),
            failed: self.failed(),
            total_latency,
            average_latency: average(total_latency, completed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn average(total: Duration, count: u64) -> Option<Duration> {
    if count == 0 {
        return None;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Some(Duration::from_nanos(
        u64::try_from(nanos).unwrap_or(u64::MAX),
    ))
}

/// A snapshot of metrics for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Attempts whose latency was counted
    pub completed: u64,
    /// Workers rejected by the rate limiter
    pub throttled: u64,
    /// Admitted writes that failed
    pub failed: u64,
    /// Sum of counted latencies
    pub total_latency: Duration,
    /// Mean of counted latencies, `None` when nothing completed
    pub average_latency: Option<Duration>,
}

impl MetricsSnapshot {
    /// Check if any attempt has completed yet.
    pub fn has_data(&self) -> bool {
        self.completed > 0
    }
}
