//! # Query Result Caching Layer
//!
//! Caches the output of natural-language analysis so that repeated questions
//! against unchanged data are answered without another model call.
//!
//! ## Features
//!
//! - **Deterministic keys**: `query:{source}:{fingerprint}:{hash}` over a
//!   normalized prompt
//! - **Fingerprint invalidation**: replacing a data source's content mints a
//!   new fingerprint, so stale answers simply stop being addressed
//! - **Pluggable backends**: in-memory (TTL + LRU) or Redis behind
//!   [`KeyValueStore`]
//! - **Best-effort semantics**: backend failures degrade to misses, never errors
//! - **Single-flight**: optional per-key de-duplication of concurrent misses
//!
//! ## Example
//!
//! ```rust
//! use querycache::cache::{derive_key, CacheConfig, CachedQueryResult, MemoryStore, QueryResultCache};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::default();
//! let cache = QueryResultCache::new(Arc::new(MemoryStore::new(config.clone())), config);
//!
//! let key = derive_key("sales_csv", "Show revenue by month", "fp_01");
//! let answer = CachedQueryResult::new(serde_json::json!({"chart": "line"}), None);
//! cache.set(&key, &answer).await;
//!
//! let hit: Option<CachedQueryResult> = cache
//!     .get(&derive_key("sales_csv", "show REVENUE by month.", "fp_01"))
//!     .await;
//! assert!(hit.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod key;
pub mod memory;
pub mod query;
pub mod redis_store;
pub mod single_flight;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_QUERY_TTL};
pub use entry::StoredEntry;
pub use key::{derive_key, normalize_prompt, prompt_hash, Fingerprint};
pub use memory::{start_auto_cleanup, MemoryStore};
pub use query::{CachedQueryResult, QueryResultCache};
pub use redis_store::RedisStore;
pub use single_flight::{FlightGuard, SingleFlight};
pub use store::KeyValueStore;
pub use types::{CacheKey, CacheStats, MemoryStoreStats};
