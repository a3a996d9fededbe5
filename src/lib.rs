//! # querycache
//!
//! Query result caching and tier-limit gating for natural-language
//! business-intelligence queries.
//!
//! ## Features
//!
//! - Deterministic cache keys over normalized prompts and data-source fingerprints
//! - Best-effort result cache over in-memory or Redis backends
//! - Tier limits (starter / pro / agency) with monthly quota resets
//! - A query pipeline that bills only uncached answers
//!
//! ## Query Pipeline
//!
//! ```no_run
//! use querycache::{
//!     CachedQueryResult, InMemoryUsageLedger, QueryOutcome, QueryPipeline, QueryRequest,
//!     QueryResultCache, Settings,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let store = settings.build_store().await?;
//!     let cache = QueryResultCache::new(store, settings.cache.clone());
//!     let pipeline = QueryPipeline::new(cache, Arc::new(InMemoryUsageLedger::new()));
//!
//!     let request = QueryRequest::new(None, "sales_csv", "fp_01", "Show revenue by month");
//!     let outcome = pipeline
//!         .run(&request, || async {
//!             Ok(CachedQueryResult::new(serde_json::json!({"chart": "line"}), None))
//!         })
//!         .await?;
//!
//!     if let QueryOutcome::Answered { cached, .. } = outcome {
//!         println!("cached: {}", cached);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod usage;

// Re-export main types for convenience
pub use cache::{
    derive_key, normalize_prompt, CacheConfig, CacheConfigBuilder, CacheKey, CacheStats,
    CachedQueryResult, Fingerprint, KeyValueStore, MemoryStore, QueryResultCache, RedisStore,
    SingleFlight,
};
pub use config::{BackendKind, Settings};
pub use error::{QueryCacheError, Result};
pub use pipeline::{QueryOutcome, QueryPipeline, QueryRequest, UsageSummary, WriteMode};
pub use usage::{
    Feature, InMemoryUsageLedger, Limit, QueryStatus, Remaining, Tier, TierLimits, UpgradeReason,
    UsageGate, UsageLedger, UsageRecord,
};
