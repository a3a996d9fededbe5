//! Environment-driven settings
//!
//! Reads `QUERYCACHE_*` variables (after loading a `.env` file if present)
//! and builds the configured key-value backend.

use crate::cache::{start_auto_cleanup, CacheConfig, KeyValueStore, MemoryStore, RedisStore};
use crate::error::{QueryCacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const ENV_BACKEND: &str = "QUERYCACHE_BACKEND";
pub const ENV_REDIS_URL: &str = "QUERYCACHE_REDIS_URL";
pub const ENV_KEY_PREFIX: &str = "QUERYCACHE_KEY_PREFIX";
pub const ENV_TTL_SECS: &str = "QUERYCACHE_TTL_SECS";
pub const ENV_MAX_ENTRIES: &str = "QUERYCACHE_MAX_ENTRIES";

/// Which key-value backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Redis,
}

impl FromStr for BackendKind {
    type Err = QueryCacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            other => Err(QueryCacheError::ConfigError(format!(
                "{} must be 'memory' or 'redis', got '{}'",
                ENV_BACKEND, other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub backend: BackendKind,
    pub redis_url: String,
    pub cache: CacheConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and read settings from the process environment
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal outside development
        let _ = dotenv::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Read settings from explicit key/value pairs; unset keys keep defaults
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut settings = Settings::default();

        if let Some(backend) = vars.get(ENV_BACKEND) {
            settings.backend = backend.parse()?;
        }
        if let Some(url) = vars.get(ENV_REDIS_URL) {
            settings.redis_url = url.clone();
        }
        if let Some(prefix) = vars.get(ENV_KEY_PREFIX) {
            settings.cache.key_prefix = prefix.clone();
        }
        if let Some(ttl) = vars.get(ENV_TTL_SECS) {
            settings.cache.default_ttl = Duration::from_secs(parse_number(ENV_TTL_SECS, ttl)?);
        }
        if let Some(max) = vars.get(ENV_MAX_ENTRIES) {
            settings.cache.max_entries = parse_number(ENV_MAX_ENTRIES, max)? as usize;
        }

        settings
            .cache
            .validate()
            .map_err(QueryCacheError::ConfigError)?;

        Ok(settings)
    }

    /// In-memory store, with its cleanup loop spawned when enabled
    ///
    /// Must be called from within a tokio runtime when auto cleanup is on.
    pub fn build_memory_store(&self) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new(self.cache.clone()));
        if self.cache.enable_auto_cleanup {
            tokio::spawn(start_auto_cleanup(store.clone()));
        }
        store
    }

    /// Construct the configured backend
    ///
    /// Redis is contacted once here so a bad URL fails at startup rather than
    /// as a stream of cache misses.
    pub async fn build_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        match self.backend {
            BackendKind::Memory => {
                info!("Using in-memory cache backend");
                let store: Arc<dyn KeyValueStore> = self.build_memory_store();
                Ok(store)
            }
            BackendKind::Redis => {
                let store = RedisStore::connect(&self.redis_url, self.cache.key_prefix.clone()).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|e| {
        QueryCacheError::ConfigError(format!("{} must be a positive integer: {}", name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(settings.backend, BackendKind::Memory);
        assert_eq!(settings.cache.default_ttl, Duration::from_secs(3600));
        assert_eq!(settings.redis_url, "redis://localhost:6379");
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = Settings::from_vars([
            (ENV_BACKEND, "Redis"),
            (ENV_REDIS_URL, "redis://cache:6380"),
            (ENV_KEY_PREFIX, "bi:"),
            (ENV_TTL_SECS, "600"),
            (ENV_MAX_ENTRIES, "42"),
        ])
        .unwrap();

        assert_eq!(settings.backend, BackendKind::Redis);
        assert_eq!(settings.redis_url, "redis://cache:6380");
        assert_eq!(settings.cache.key_prefix, "bi:");
        assert_eq!(settings.cache.default_ttl, Duration::from_secs(600));
        assert_eq!(settings.cache.max_entries, 42);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Settings::from_vars([(ENV_BACKEND, "memcached")]),
            Err(QueryCacheError::ConfigError(_))
        ));
        assert!(matches!(
            Settings::from_vars([(ENV_TTL_SECS, "soon")]),
            Err(QueryCacheError::ConfigError(_))
        ));
        assert!(matches!(
            Settings::from_vars([(ENV_TTL_SECS, "0")]),
            Err(QueryCacheError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_cleans_up_without_reads() {
        let mut settings = Settings::default();
        settings.cache.cleanup_interval = Duration::from_millis(20);

        let store = settings.build_memory_store();
        store
            .set_with_expiry("old", b"v".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_memory_store_without_auto_cleanup() {
        let mut settings = Settings::default();
        settings.cache.enable_auto_cleanup = false;
        settings.cache.cleanup_interval = Duration::from_millis(20);

        let store = settings.build_memory_store();
        store
            .set_with_expiry("old", b"v".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let settings = Settings::default();
        let store = settings.build_store().await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }
}
