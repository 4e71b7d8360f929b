//! End-to-end sequencing of one run.
//!
//! Provision the store, dispatch the workers with live reporting, print the
//! last stats line, clean up, and summarize.

use crate::application::dispatcher::{Dispatcher, RunReport};
use crate::application::limiter::WindowRateLimiter;
use crate::application::metrics::{Metrics, MetricsSnapshot};
use crate::application::ports::{Clock, ProvisionError, WriteStore};
use crate::application::reporter::{stdout_formatter, Reporter, ReporterConfig, SnapshotFormatter};
use crate::application::shutdown::{ShutdownCoordinator, ShutdownReason};
use crate::config::HarnessConfig;
use crate::domain::config::ConfigError;
use crate::infrastructure::clock::SystemClock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Fatal errors of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Invalid configuration
    Config(ConfigError),
    /// Store setup failed
    Provision(ProvisionError),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Config(e) => write!(f, "configuration error: {}", e),
            HarnessError::Provision(e) => write!(f, "provisioning error: {}", e),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Config(e) => Some(e),
            HarnessError::Provision(e) => Some(e),
        }
    }
}

impl From<ConfigError> for HarnessError {
    fn from(e: ConfigError) -> Self {
        HarnessError::Config(e)
    }
}

impl From<ProvisionError> for HarnessError {
    fn from(e: ProvisionError) -> Self {
        HarnessError::Provision(e)
    }
}

/// Final structured summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Workers dispatched
    pub requests_sent: usize,
    /// Maximum admissions per window
    pub max_rate: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Attempts counted toward latency
    pub processed: u64,
    /// Workers rejected by the rate limiter
    pub throttled: u64,
    /// Admitted writes that failed
    pub failed: u64,
    #[serde(with = "humantime_serde")]
    pub average_latency: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Build a summary from the final metrics.
    pub fn new(config: &HarnessConfig, snapshot: &MetricsSnapshot, elapsed: Duration) -> Self {
        Self {
            requests_sent: config.fanout,
            max_rate: config.rate_limit,
            window: config.window,
            processed: snapshot.completed,
            throttled: snapshot.throttled,
            failed: snapshot.failed,
            average_latency: snapshot.average_latency,
            elapsed,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nFINAL RESULT:")?;
        writeln!(f, "Requests Sent: \t\t{}", self.requests_sent)?;
        writeln!(
            f,
            "Maximum Requests Rate: \t{}/{}",
            self.max_rate,
            humantime::format_duration(self.window)
        )?;
        writeln!(f, "Requests Processed: \t{}", self.processed)?;
        writeln!(f, "Requests Throttled: \t{}", self.throttled)?;
        writeln!(f, "Requests Failed: \t{}", self.failed)?;
        match self.average_latency {
            Some(average) => writeln!(f, "Average Latency: \t{:?}", average)?,
            None => writeln!(f, "Average Latency: \tn/a")?,
        }
        write!(f, "Process Execution Time: {:?}", self.elapsed)
    }
}

/// Runs the load against one store.
pub struct Harness {
    config: HarnessConfig,
    store: Arc<dyn WriteStore>,
    clock: Arc<dyn Clock>,
    formatter: SnapshotFormatter,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Harness {
    /// Create a harness for `store`.
    ///
    /// # Errors
    /// Returns a `ConfigError` if `config` is invalid.
    pub fn new(config: HarnessConfig, store: Arc<dyn WriteStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        let coordinator = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&store),
            config.drop_after,
        ));
        Ok(Self {
            config,
            store,
            clock: Arc::new(SystemClock::new()),
            formatter: stdout_formatter(),
            coordinator,
        })
    }

    /// Use a different clock for the rate limiter.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different renderer for live stats.
    pub fn with_formatter(mut self, formatter: SnapshotFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Shared shutdown coordinator, for wiring watchdogs.
    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Get the run configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// # Errors
    /// Returns `HarnessError::Provision` if the store cannot be provisioned.
    /// Individual write failures never fail the run.
    pub async fn run(&self) -> Result<RunSummary, HarnessError> {
        self.store.provision().await?;
        info!(fanout = self.config.fanout, rate = self.config.rate_limit, "store provisioned");

        let limiter = WindowRateLimiter::new(
            self.config.rate_limiter_config()?,
            Arc::clone(&self.clock),
        );
        let metrics = Metrics::new();
        let dispatcher = Dispatcher::new(
            Arc::new(limiter),
            metrics.clone(),
            self.config.latency_cutoff(),
        );

        let reporter = Reporter::new(
            metrics.clone(),
            ReporterConfig::new(self.config.report_interval)?,
        )
        .start(Arc::clone(&self.formatter));

        let started = Instant::now();
        let dispatched = dispatcher
            .run_writes(
                self.config.fanout,
                Arc::clone(&self.store),
                self.config.payload(),
            )
            .await;
        let elapsed = started.elapsed();

        if let Err(e) = reporter.shutdown().await {
            warn!(error = %e, "reporter did not stop cleanly");
        }

        let snapshot = metrics.snapshot();
        if snapshot.has_data() {
            (self.formatter)(&snapshot);
        }

        self.coordinator.cleanup(ShutdownReason::Completed).await;

        let report: RunReport = dispatched?;
        info!(
            succeeded = report.succeeded,
            failed = report.failed(),
            throttled = report.throttled,
            "run finished"
        );

        Ok(RunSummary::new(&self.config, &snapshot, elapsed))
    }
}
