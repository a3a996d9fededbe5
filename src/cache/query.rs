//! Best-effort cache for natural-language query results
//!
//! Wraps any [`KeyValueStore`] and never lets a backend problem reach the
//! caller: failed reads look like misses, failed writes and deletes are
//! no-ops. Every failure is logged at `warn`. The pipeline produces the same
//! answer with or without a working cache; only latency and billing differ.

use crate::cache::{
    config::CacheConfig,
    store::KeyValueStore,
    types::CacheStats,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Analysis output plus its optional explanation, as stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedQueryResult {
    /// Structured analysis result (chart definition, rows, ...)
    pub result: serde_json::Value,

    /// Natural-language explanation, if one was produced
    pub explanation: Option<String>,

    /// When the analysis finished
    pub cached_at: DateTime<Utc>,
}

impl CachedQueryResult {
    pub fn new(result: serde_json::Value, explanation: Option<String>) -> Self {
        Self {
            result,
            explanation,
            cached_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

/// Query result cache over an injected key-value backend
#[derive(Clone)]
pub struct QueryResultCache {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    counters: Arc<Counters>,
}

impl QueryResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// TTL used by [`set`](Self::set)
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Look up and deserialize a value; `None` on miss or any failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("Cache miss: {}", key);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                warn!(backend = self.backend_name(), "Cache get error for {}: {}", key, e);
                self.record_failed_read();
                return None;
            }
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Err(e) => {
                warn!("Cache entry {} could not be deserialized: {}", key, e);
                self.record_failed_read();
                None
            }
        }
    }

    /// Store a value with the default TTL
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.config.default_ttl).await
    }

    /// Store a value with an explicit TTL
    pub async fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if let Some(bytes) = self.encode(key, value) {
            self.write(key, bytes, ttl).await;
        }
    }

    /// Serialize now, write on a background task
    ///
    /// The returned handle may be dropped; the write still runs. A process
    /// exiting before the task completes loses the entry.
    pub fn spawn_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> JoinHandle<()> {
        let bytes = self.encode(key, value);
        let cache = self.clone();
        let key = key.to_string();
        let ttl = self.config.default_ttl;

        tokio::spawn(async move {
            if let Some(bytes) = bytes {
                cache.write(&key, bytes, ttl).await;
            }
        })
    }

    /// Explicitly invalidate a key
    pub async fn delete(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(()) => {
                debug!("Cache delete: {}", key);
                self.counters.deletes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(backend = self.backend_name(), "Cache delete error for {}: {}", key, e);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Snapshot of hit/miss/error counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Option<Vec<u8>> {
        match serde_json::to_vec(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Cache value for {} could not be serialized: {}", key, e);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn write(&self, key: &str, bytes: Vec<u8>, ttl: Duration) {
        match self.store.set_with_expiry(key, bytes, ttl).await {
            Ok(()) => {
                debug!("Cache set: {} (ttl {:?})", key, ttl);
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(backend = self.backend_name(), "Cache set error for {}: {}", key, e);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_failed_read(&self) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
    }
}
