//! # rate-bench
//!
//! Rate-limited concurrent write load generator with lock-free latency metrics.
//!
//! A run dispatches a fixed number of workers at once. Each worker asks a
//! rolling-window rate limiter for admission; admitted workers write one random
//! key/value pair to a store and report the latency of that write, rejected
//! workers are counted as throttled. Live stats are printed while the run is
//! in flight and a summary is produced at the end.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rate_bench::{Harness, HarnessConfig, InMemoryStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // 100 concurrent workers, at most 10 admitted per second
//! let config = HarnessConfig::new(100, 10);
//! let harness = Harness::new(config, Arc::new(InMemoryStore::default()))?;
//!
//! let summary = harness.run().await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Rate Limiting
//!
//! The limiter admits at most `rate` requests per window. The first call after
//! the window has elapsed starts a fresh one; unused budget is not carried
//! over.
//!
//! ```rust
//! use rate_bench::{RateLimiter, RateLimiterConfig, SystemClock, WindowRateLimiter};
//! use std::sync::Arc;
//!
//! let config = RateLimiterConfig::per_second(40).unwrap();
//! let limiter = WindowRateLimiter::new(config, Arc::new(SystemClock::new()));
//!
//! let admitted = (0..41).filter(|_| limiter.allow_request()).count();
//! assert_eq!(admitted, 40);
//! ```
//!
//! ## Latency Accounting
//!
//! Successful writes always count toward the average latency. A failed write
//! counts too when it took longer than the latency cutoff (one fifth of the
//! request timeout), so a cluster that is timing out still shows up as slow
//! rather than disappearing from the average.
//!
//! ## Stores
//!
//! - [`InMemoryStore`]: DashMap-backed, for dry runs and tests
//! - `RedisStore`: Redis server (feature `redis-store`, on by default)

// Domain layer - pure values and rules
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

pub mod cli;
pub mod config;

// Re-export commonly used types for convenience
pub use domain::{
    config::{ConfigError, RateLimiterConfig},
    outcome::{LatencyCutoff, WorkerId, WorkerOutcome},
    payload::{Payload, PayloadGenerator},
};

pub use application::{
    dispatcher::{Attempt, Dispatcher, RunReport},
    harness::{Harness, HarnessError, RunSummary},
    limiter::WindowRateLimiter,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, OperationError, ProvisionError, RateLimiter, WriteStore},
    reporter::{Reporter, ReporterConfig, ReporterHandle, ShutdownError, SnapshotFormatter},
    shutdown::{ExitHook, ShutdownCoordinator, ShutdownReason},
};

pub use config::{HarnessConfig, Namespace};

pub use infrastructure::{clock::SystemClock, memory_store::InMemoryStore};

#[cfg(feature = "redis-store")]
pub use infrastructure::redis_store::{RedisStore, RedisStoreConfig};
