//! Redis-backed write store.
//!
//! ## Layout
//!
//! - Rows: `{keyspace}:{table}:{key}` holding the value as a plain string
//! - Schema marker: `{keyspace}:{table}:__schema__`, written once with `SET NX`
//!
//! Provisioning pings the server and writes the marker. Teardown drops the
//! whole keyspace: it scans `{keyspace}:*` and deletes every match, so rows of
//! other tables in the same keyspace go too.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rate_bench::{Namespace, RedisStore, RedisStoreConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RedisStoreConfig {
//!         namespace: Namespace::new("scylla_bench", "test"),
//!         request_timeout: Some(Duration::from_secs(5)),
//!     };
//!
//!     let store = RedisStore::connect("redis://127.0.0.1/", config)
//!         .await
//!         .expect("Failed to connect to Redis");
//! }
//! ```

use crate::application::ports::{OperationError, ProvisionError, WriteStore};
use crate::config::Namespace;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_MARKER: &str = "__schema__";
const SCAN_BATCH: usize = 500;

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Where rows are written
    pub namespace: Namespace,
    /// Per-write timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            namespace: Namespace::default(),
            request_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Write store backed by a Redis server.
///
/// The connection manager multiplexes one connection and reconnects on
/// failure; each call works on a cheap clone of it.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    /// * `config` - Store configuration
    ///
    /// # Errors
    /// Returns `ProvisionError::Connect` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &str, config: RedisStoreConfig) -> Result<Self, ProvisionError> {
        let client = Client::open(url).map_err(|e| ProvisionError::Connect(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| ProvisionError::Connect(e.to_string()))?;

        Ok(Self { connection, config })
    }

    /// Get the store configuration.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    fn schema_key(&self) -> String {
        self.config.namespace.qualify(SCHEMA_MARKER)
    }

    async fn write(&self, key: String, value: &str) -> Result<(), RedisError> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await
    }
}

fn operation_error(e: RedisError) -> OperationError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        OperationError::Transport(e.to_string())
    } else {
        OperationError::Store(e.to_string())
    }
}

#[async_trait]
impl WriteStore for RedisStore {
    async fn provision(&self) -> Result<(), ProvisionError> {
        let mut conn = self.connection.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ProvisionError::Connect(e.to_string()))?;

        let created: Option<String> = redis::cmd("SET")
            .arg(self.schema_key())
            .arg(1)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| ProvisionError::Schema(e.to_string()))?;

        info!(
            namespace = %self.config.namespace,
            created = created.is_some(),
            "redis namespace ready"
        );
        Ok(())
    }

    async fn teardown(&self) -> Result<(), ProvisionError> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", self.config.namespace.keyspace_prefix());
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| ProvisionError::Schema(e.to_string()))?;

            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(&keys)
                    .await
                    .map_err(|e| ProvisionError::Schema(e.to_string()))?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        info!(keyspace = %self.config.namespace.keyspace, removed, "redis keyspace dropped");
        Ok(())
    }

    async fn execute_write(&self, key: &str, value: &str) -> Result<(), OperationError> {
        let key = self.config.namespace.qualify(key);

        match self.config.request_timeout {
            Some(limit) if !limit.is_zero() => {
                match tokio::time::timeout(limit, self.write(key, value)).await {
                    Ok(result) => result.map_err(operation_error),
                    Err(_) => {
                        debug!(timeout = ?limit, "redis write timed out");
                        Err(OperationError::Timeout(limit))
                    }
                }
            }
            _ => self.write(key, value).await.map_err(operation_error),
        }
    }
}
