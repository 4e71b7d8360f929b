//! Periodic reporting of aggregate statistics.
//!
//! The reporter only reads [`Metrics`]; nothing in the run depends on it.

use crate::application::metrics::{Metrics, MetricsSnapshot};
use crate::domain::config::ConfigError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Function type for rendering a snapshot.
pub type SnapshotFormatter = Arc<dyn Fn(&MetricsSnapshot) + Send + Sync + 'static>;

/// Error returned when the reporter task fails to stop cleanly.
#[derive(Debug)]
pub struct ShutdownError(tokio::task::JoinError);

impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reporter task failed during shutdown: {}", self.0)
    }
}

impl std::error::Error for ShutdownError {}

/// Configuration for periodic reporting.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// How often to report
    pub interval: Duration,
}

impl ReporterConfig {
    /// Create a reporter config with the specified interval.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroReportInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroReportInterval);
        }
        Ok(Self { interval })
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1),
        }
    }
}

/// Render a snapshot as the live stats line.
///
/// Returns `None` until at least one request has completed.
pub fn format_snapshot(snapshot: &MetricsSnapshot) -> Option<String> {
    let average = snapshot.average_latency?;
    Some(format!(
        "Total requests: {}, Average latency: {:?}",
        snapshot.completed, average
    ))
}

/// Default formatter: print the live stats line to stdout.
pub fn stdout_formatter() -> SnapshotFormatter {
    Arc::new(|snapshot: &MetricsSnapshot| {
        if let Some(line) = format_snapshot(snapshot) {
            println!("{}", line);
        }
    })
}

/// Emits metrics snapshots at a fixed interval.
pub struct Reporter {
    metrics: Metrics,
    config: ReporterConfig,
}

impl Reporter {
    /// Create a new reporter.
    pub fn new(metrics: Metrics, config: ReporterConfig) -> Self {
        Self { metrics, config }
    }

    /// Start reporting in a background task.
    ///
    /// The formatter is called once per tick, skipping ticks where nothing has
    /// completed yet.
    pub fn start(self, formatter: SnapshotFormatter) -> ReporterHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let snapshot = self.metrics.snapshot();
                        if snapshot.has_data() {
                            formatter(&snapshot);
                        }
                    }
                }
            }
        });

        ReporterHandle {
            stop: Some(stop_tx),
            task,
        }
    }

    /// Get the reporter configuration.
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }
}

/// Handle to a running reporter.
///
/// Dropping the handle without calling [`ReporterHandle::shutdown`] leaves the
/// task running until the runtime shuts down.
pub struct ReporterHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReporterHandle {
    /// Stop the reporter and wait for its task to finish.
    ///
    /// # Errors
    /// Returns an error if the task panicked.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(stop) = self.stop.take() {
            // The task may already be gone; that is fine.
            let _ = stop.send(());
        }
        self.task.await.map_err(ShutdownError)
    }
}
