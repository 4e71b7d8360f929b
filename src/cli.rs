//! Command-line interface.

use crate::config::{HarnessConfig, Namespace};
use crate::domain::config::ConfigError;
use clap::{ArgAction, Parser, ValueEnum};
use std::time::Duration;

/// Which store the workers write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-process map; no cluster needed
    Memory,
    /// Redis server at `--cluster`
    #[cfg(feature = "redis-store")]
    Redis,
}

impl Backend {
    /// Check if the backend connects to an external store.
    pub fn needs_cluster(self) -> bool {
        match self {
            Backend::Memory => false,
            #[cfg(feature = "redis-store")]
            Backend::Redis => true,
        }
    }
}

#[cfg(feature = "redis-store")]
impl Default for Backend {
    fn default() -> Self {
        Backend::Redis
    }
}

#[cfg(not(feature = "redis-store"))]
impl Default for Backend {
    fn default() -> Self {
        Backend::Memory
    }
}

/// Rate-limited concurrent write load generator.
#[derive(Debug, Clone, Parser)]
#[command(name = "rate-bench", version, about)]
pub struct Cli {
    /// Store address, e.g. redis://127.0.0.1/
    #[arg(long)]
    pub cluster: Option<String>,

    /// Store backend
    #[arg(long, value_enum, default_value_t = Backend::default())]
    pub backend: Backend,

    /// Namespace for the written rows
    #[arg(long, default_value = "scylla_bench")]
    pub keyspace: String,

    /// Table inside the namespace
    #[arg(long, default_value = "test")]
    pub table: String,

    /// Number of concurrent workers
    #[arg(long)]
    pub parallelism: usize,

    /// Maximum requests admitted per window
    #[arg(long = "rate-limit")]
    pub rate_limit: u32,

    /// Rate limiter window
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    pub window: Duration,

    /// Per-request timeout; 0s disables it
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Abort the whole run after this long
    #[arg(long = "process-timeout", default_value = "30m", value_parser = humantime::parse_duration)]
    pub process_timeout: Duration,

    /// Interval between live stats lines
    #[arg(long = "report-interval", default_value = "1ms", value_parser = humantime::parse_duration)]
    pub report_interval: Duration,

    /// Drop the namespace when the run ends
    #[arg(long = "drop-db", default_value_t = true, action = ArgAction::Set)]
    pub drop_db: bool,

    /// Length of generated keys
    #[arg(long = "key-length", default_value_t = 5)]
    pub key_length: usize,

    /// Length of generated values
    #[arg(long = "value-length", default_value_t = 10)]
    pub value_length: usize,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Log filter, e.g. "warn" or "rate_bench=debug"; falls back to RUST_LOG
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Namespace selected by `--keyspace` and `--table`.
    pub fn namespace(&self) -> Namespace {
        Namespace::new(&self.keyspace, &self.table)
    }

    /// Build and validate the harness configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingCluster` when a networked backend has no
    /// `--cluster`, or any validation error of [`HarnessConfig`].
    pub fn to_config(&self) -> Result<HarnessConfig, ConfigError> {
        if self.backend.needs_cluster() && self.cluster.is_none() {
            return Err(ConfigError::MissingCluster);
        }

        let config = HarnessConfig {
            fanout: self.parallelism,
            rate_limit: self.rate_limit,
            window: self.window,
            request_timeout: (!self.timeout.is_zero()).then_some(self.timeout),
            process_timeout: self.process_timeout,
            report_interval: self.report_interval,
            drop_after: self.drop_db,
            key_length: self.key_length,
            value_length: self.value_length,
        };
        config.validate()?;
        Ok(config)
    }
}
