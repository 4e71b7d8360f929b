//! In-process store backed by DashMap.
//!
//! Useful for dry runs and tests: no network, but the same provisioning
//! contract as a real cluster.

use crate::application::ports::{OperationError, ProvisionError, WriteStore};
use crate::config::Namespace;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Thread-safe in-memory key-value store.
///
/// DashMap shards its locks, so concurrent workers rarely contend.
#[derive(Debug)]
pub struct InMemoryStore {
    namespace: Namespace,
    rows: DashMap<String, String>,
    provisioned: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty, unprovisioned store.
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            rows: DashMap::new(),
            provisioned: AtomicBool::new(false),
        }
    }

    /// Get the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.rows
            .get(&self.namespace.qualify(key))
            .map(|entry| entry.value().clone())
    }

    /// Get the number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if `provision` has run without a later `teardown`.
    pub fn is_provisioned(&self) -> bool {
        self.provisioned.load(Ordering::Acquire)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Namespace::default())
    }
}

#[async_trait]
impl WriteStore for InMemoryStore {
    async fn provision(&self) -> Result<(), ProvisionError> {
        self.provisioned.store(true, Ordering::Release);
        info!(namespace = %self.namespace, "in-memory namespace ready");
        Ok(())
    }

    async fn teardown(&self) -> Result<(), ProvisionError> {
        self.provisioned.store(false, Ordering::Release);
        self.rows.clear();
        info!(namespace = %self.namespace, "in-memory namespace dropped");
        Ok(())
    }

    async fn execute_write(&self, key: &str, value: &str) -> Result<(), OperationError> {
        if !self.is_provisioned() {
            return Err(OperationError::NotProvisioned);
        }
        self.rows
            .insert(self.namespace.qualify(key), value.to_string());
        Ok(())
    }
}
