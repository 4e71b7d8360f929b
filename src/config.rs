//! Run configuration.
//!
//! Values only; parsing lives in [`crate::cli`].

use crate::domain::config::{ConfigError, RateLimiterConfig};
use crate::domain::outcome::LatencyCutoff;
use crate::domain::payload::PayloadGenerator;
use std::fmt;
use std::time::Duration;

/// Where writes land: a keyspace (namespace) and a table inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub keyspace: String,
    pub table: String,
}

impl Namespace {
    /// Create a namespace.
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
        }
    }

    /// Prefix shared by every key in the keyspace, across all tables.
    pub fn keyspace_prefix(&self) -> String {
        format!("{}:", self.keyspace)
    }

    /// Prefix shared by every key written into this table.
    pub fn key_prefix(&self) -> String {
        format!("{}:{}:", self.keyspace, self.table)
    }

    /// Fully qualified key for `key`.
    pub fn qualify(&self, key: &str) -> String {
        format!("{}:{}:{}", self.keyspace, self.table, key)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new("scylla_bench", "test")
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

/// Everything the harness needs to run once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Number of concurrent workers
    pub fanout: usize,
    /// Maximum admissions per window
    pub rate_limit: u32,
    /// Rate limiter window
    pub window: Duration,
    /// Per-request timeout; `None` disables it
    pub request_timeout: Option<Duration>,
    /// Hard limit for the whole run
    pub process_timeout: Duration,
    /// Live stats interval
    pub report_interval: Duration,
    /// Drop the namespace when the run ends
    pub drop_after: bool,
    /// Length of generated keys
    pub key_length: usize,
    /// Length of generated values
    pub value_length: usize,
}

impl HarnessConfig {
    /// Create a config with default timings for `fanout` workers at `rate_limit` per second.
    pub fn new(fanout: usize, rate_limit: u32) -> Self {
        Self {
            fanout,
            rate_limit,
            window: Duration::from_secs(1),
            request_timeout: Some(Duration::from_secs(5)),
            process_timeout: Duration::from_secs(30 * 60),
            report_interval: Duration::from_millis(1),
            drop_after: true,
            key_length: 5,
            value_length: 10,
        }
    }

    /// Check every value before any work starts.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fanout == 0 {
            return Err(ConfigError::ZeroFanout);
        }
        self.rate_limiter_config()?;
        if self.report_interval.is_zero() {
            return Err(ConfigError::ZeroReportInterval);
        }
        Ok(())
    }

    /// Rate limiter settings.
    pub fn rate_limiter_config(&self) -> Result<RateLimiterConfig, ConfigError> {
        RateLimiterConfig::new(self.rate_limit, self.window)
    }

    /// Cutoff for counting failed writes toward latency.
    pub fn latency_cutoff(&self) -> LatencyCutoff {
        LatencyCutoff::from_request_timeout(self.request_timeout)
    }

    /// Payload generator for the configured key and value lengths.
    pub fn payload(&self) -> PayloadGenerator {
        PayloadGenerator::new(self.key_length, self.value_length)
    }

    /// Configuration header printed before the run.
    pub fn banner(&self) -> String {
        format!(
            "Configuration\nConcurrency:\t\t {}\nMaximum Rate Limit:\t {} req/{}",
            self.fanout,
            self.rate_limit,
            humantime::format_duration(self.window)
        )
    }
}
