//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for admission control.
///
/// The dispatcher only depends on this trait, so alternative algorithms
/// (token bucket, leaky bucket) can be substituted for the window limiter.
pub trait RateLimiter: Send + Sync + Debug {
    /// Decide whether a request may start now.
    ///
    /// Admitted requests consume budget; rejected ones are dropped, never queued.
    fn allow_request(&self) -> bool;

    /// Start a fresh window with an empty budget.
    ///
    /// Idempotent: redundant calls are harmless.
    fn reset_window(&self);
}

/// Error from a single write. Recovered locally by the worker that hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The write did not finish within the per-request timeout
    Timeout(Duration),
    /// The store rejected the write
    Store(String),
    /// The connection to the store failed
    Transport(String),
    /// The target namespace was not provisioned
    NotProvisioned,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationError::Timeout(after) => {
                write!(f, "write timed out after {:?}", after)
            }
            OperationError::Store(msg) => write!(f, "store error: {}", msg),
            OperationError::Transport(msg) => write!(f, "transport error: {}", msg),
            OperationError::NotProvisioned => {
                write!(f, "namespace has not been provisioned")
            }
        }
    }
}

impl std::error::Error for OperationError {}

/// Error from setting up or tearing down the store. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// Could not reach the store
    Connect(String),
    /// Could not create or drop the namespace
    Schema(String),
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionError::Connect(msg) => write!(f, "failed to connect to store: {}", msg),
            ProvisionError::Schema(msg) => write!(f, "failed to provision store: {}", msg),
        }
    }
}

impl std::error::Error for ProvisionError {}

/// Port for the data store under load.
///
/// Implementations must be safe to call from many workers at once; the
/// harness adds no synchronization around `execute_write`.
#[async_trait]
pub trait WriteStore: Send + Sync + Debug {
    /// Ensure the namespace and table exist. Idempotent.
    async fn provision(&self) -> Result<(), ProvisionError>;

    /// Drop whatever `provision` created.
    async fn teardown(&self) -> Result<(), ProvisionError>;

    /// Write one key/value pair.
    async fn execute_write(&self, key: &str, value: &str) -> Result<(), OperationError>;
}
