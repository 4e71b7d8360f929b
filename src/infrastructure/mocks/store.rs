//! Scripted write store for testing.

use crate::application::ports::{OperationError, ProvisionError, WriteStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Store whose every write behaves the same, as scripted at construction.
///
/// Counts calls so tests can assert on how the harness used it.
///
/// # Examples
///
/// ```
/// use rate_bench::infrastructure::mocks::ScriptedStore;
/// use rate_bench::application::ports::{OperationError, WriteStore};
///
/// # tokio_test_block_on(async {
/// let store = ScriptedStore::failing(OperationError::NotProvisioned);
/// assert!(store.execute_write("k", "v").await.is_err());
/// assert_eq!(store.writes(), 1);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct ScriptedStore {
    outcome: Result<(), OperationError>,
    latency: Duration,
    fail_provision: bool,
    writes: AtomicUsize,
    provisions: AtomicUsize,
    teardowns: AtomicUsize,
}

impl ScriptedStore {
    fn with_outcome(outcome: Result<(), OperationError>) -> Self {
        Self {
            outcome,
            latency: Duration::ZERO,
            fail_provision: false,
            writes: AtomicUsize::new(0),
            provisions: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
        }
    }

    /// Every write succeeds.
    pub fn succeeding() -> Self {
        Self::with_outcome(Ok(()))
    }

    /// Every write fails with `error`.
    pub fn failing(error: OperationError) -> Self {
        Self::with_outcome(Err(error))
    }

    /// Sleep for `latency` (tokio time) inside every write and teardown.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `provision` fail.
    pub fn with_provision_failure(mut self) -> Self {
        self.fail_provision = true;
        self
    }

    /// Number of writes attempted.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of provision calls.
    pub fn provisions(&self) -> usize {
        self.provisions.load(Ordering::SeqCst)
    }

    /// Number of teardown calls.
    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl WriteStore for ScriptedStore {
    async fn provision(&self) -> Result<(), ProvisionError> {
        self.provisions.fetch_add(1, Ordering::SeqCst);
        if self.fail_provision {
            return Err(ProvisionError::Connect("scripted failure".to_string()));
        }
        Ok(())
    }

    async fn teardown(&self) -> Result<(), ProvisionError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(())
    }

    async fn execute_write(&self, _key: &str, _value: &str) -> Result<(), OperationError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.outcome.clone()
    }
}
