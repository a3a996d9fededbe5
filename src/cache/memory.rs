//! In-memory key-value backend with TTL expiry and LRU eviction

use crate::cache::{
    config::CacheConfig,
    entry::StoredEntry,
    store::KeyValueStore,
    types::{CacheKey, MemoryStoreStats},
};
use crate::error::{QueryCacheError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Process-local store for tests and single-instance deployments
///
/// - Thread-safe async access via RwLock
/// - Expired entries read as misses and are dropped on access
/// - LRU eviction when the entry count or byte budget is exceeded
pub struct MemoryStore {
    pub(crate) config: CacheConfig,
    inner: Arc<RwLock<MemoryInner>>,
}

struct MemoryInner {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, StoredEntry>,

    /// LRU tracking: front is least recently used
    lru_queue: VecDeque<CacheKey>,

    stats: MemoryStoreStats,
}

impl MemoryStore {
    /// Create a new store with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!(
            "Initializing in-memory store (max_entries: {}, max_size_bytes: {})",
            config.max_entries, config.max_size_bytes
        );

        Self {
            config,
            inner: Arc::new(RwLock::new(MemoryInner {
                entries: HashMap::new(),
                lru_queue: VecDeque::new(),
                stats: MemoryStoreStats::default(),
            })),
        }
    }

    /// Remove all expired entries, returning the keys that were dropped
    pub async fn cleanup_expired(&self) -> Vec<CacheKey> {
        let mut inner = self.inner.write().await;

        let expired_keys: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.remove_entry(key);
        }
        inner.stats.evictions_ttl += expired_keys.len() as u64;

        if !expired_keys.is_empty() {
            debug!("Cleaned up {} expired entries", expired_keys.len());
        }

        expired_keys
    }

    /// Clear all entries
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.entries.len();
        inner.entries.clear();
        inner.lru_queue.clear();
        inner.stats.entries = 0;
        inner.stats.size_bytes = 0;

        info!("Cleared {} entries from in-memory store", count);
    }

    /// Check if a live entry exists (without touching LRU order)
    pub async fn contains_key(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Number of stored entries, expired ones included until cleanup
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Get store statistics
    pub async fn stats(&self) -> MemoryStoreStats {
        self.inner.read().await.stats.clone()
    }

    fn evict_if_needed(&self, inner: &mut MemoryInner, needed_size: usize) -> Result<()> {
        if needed_size > self.config.max_size_bytes {
            return Err(QueryCacheError::BackendError(format!(
                "entry of {} bytes exceeds store capacity of {} bytes",
                needed_size, self.config.max_size_bytes
            )));
        }

        while inner.entries.len() >= self.config.max_entries {
            match inner.lru_queue.pop_front() {
                Some(key) => {
                    debug!("Evicting entry due to max_entries limit: {}", key);
                    inner.remove_entry(&key);
                    inner.stats.evictions_size += 1;
                }
                None => break,
            }
        }

        while inner.stats.size_bytes + needed_size > self.config.max_size_bytes {
            match inner.lru_queue.pop_front() {
                Some(key) => {
                    debug!("Evicting entry due to size limit: {}", key);
                    inner.remove_entry(&key);
                    inner.stats.evictions_size += 1;
                }
                None => {
                    warn!("Cannot evict more entries, store size limit exceeded");
                    return Err(QueryCacheError::BackendError(
                        "store size limit exceeded".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl MemoryInner {
    fn remove_entry(&mut self, key: &str) -> Option<StoredEntry> {
        let entry = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.stats.size_bytes = self.stats.size_bytes.saturating_sub(entry.calculate_size());
        self.stats.entries = self.entries.len();
        Some(entry)
    }

    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.write().await;

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(None),
        };

        if expired {
            debug!("Entry expired: {}", key);
            inner.remove_entry(key);
            inner.stats.evictions_ttl += 1;
            return Ok(None);
        }

        inner.touch(key);
        Ok(inner.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = StoredEntry::new(key.to_string(), value, ttl);
        let size = entry.calculate_size();

        let mut inner = self.inner.write().await;

        // Replacing an entry frees its slot before any eviction decision
        inner.remove_entry(key);
        self.evict_if_needed(&mut inner, size)?;

        inner.entries.insert(key.to_string(), entry);
        inner.lru_queue.push_back(key.to_string());
        inner.stats.size_bytes += size;
        inner.stats.entries = inner.entries.len();

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.remove_entry(key).is_some() {
            debug!("Removed entry: {}", key);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Background task for automatic expiry cleanup
///
/// Holds only a weak reference; the loop ends once the store is dropped.
pub async fn start_auto_cleanup(store: Arc<MemoryStore>) {
    let interval = store.config.cleanup_interval;
    let store = Arc::downgrade(&store);

    info!("Starting automatic cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        let Some(store) = store.upgrade() else {
            debug!("In-memory store dropped, stopping cleanup task");
            break;
        };

        let removed = store.cleanup_expired().await;
        if !removed.is_empty() {
            debug!("Auto cleanup removed {} entries", removed.len());
        }
    }
}
