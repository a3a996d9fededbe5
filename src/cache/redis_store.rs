//! Redis key-value backend
//!
//! One multiplexed connection is shared by every caller. The mutex guards
//! only the slot holding it: callers clone the connection out and issue
//! commands without the lock. A connection-level failure empties the slot so
//! the next call reconnects.

use crate::cache::store::KeyValueStore;
use crate::error::{QueryCacheError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    shared: Arc<Mutex<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisStore {
    /// Create a store; the connection is opened on first use
    pub fn new(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| QueryCacheError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self::from_client(client, key_prefix))
    }

    pub fn from_client(client: Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            shared: Arc::new(Mutex::new(None)),
            key_prefix: key_prefix.into(),
        }
    }

    /// Create a store and fail early if Redis does not answer PING
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let store = Self::new(redis_url, key_prefix)?;
        store.health_check().await?;
        info!("Connected to Redis at {}", redis_url);
        Ok(store)
    }

    /// PING round trip on the shared connection
    pub async fn health_check(&self) -> Result<()> {
        self.execute(|mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    /// Whether a connection is currently cached
    pub async fn is_connected(&self) -> bool {
        self.shared.lock().await.is_some()
    }

    /// Clone of the shared connection, opening it if the slot is empty
    ///
    /// Opening happens under the lock so concurrent first callers share one
    /// connection instead of racing to open several.
    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut slot = self.shared.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| QueryCacheError::ConnectionError(format!("Connection failed: {}", e)))?;
        debug!("Opened Redis connection");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Run one command on a clone of the shared connection
    async fn execute<T, F, Fut>(&self, command: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match command(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_failure(&e) {
                    warn!("Redis connection failed, reconnecting on next use: {}", e);
                    *self.shared.lock().await = None;
                }
                Err(e.into())
            }
        }
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn is_connection_failure(e: &RedisError) -> bool {
    e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() || e.is_timeout()
}

/// SETEX rejects a zero expiry, and sub-second TTLs round up
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = self.prefixed_key(key);
        self.execute(|mut conn| async move {
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let key = self.prefixed_key(key);
        let seconds = ttl_seconds(ttl);
        self.execute(|mut conn| async move {
            let _: () = conn.set_ex(key, value, seconds).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = self.prefixed_key(key);
        self.execute(|mut conn| async move {
            let _: () = conn.del(key).await?;
            Ok(())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
