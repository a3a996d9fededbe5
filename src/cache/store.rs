//! Key-value store abstraction consumed by the query result cache

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Minimal key-value interface with per-entry expiry
///
/// Any backend satisfying this trait is interchangeable. An entry becomes
/// unreadable `ttl` after it was written; reads never renew it.
/// Implementations report failures through `Result`; deciding whether a
/// failure matters is left to the caller.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the blob stored under `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous entry
    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove `key`; removing a missing key succeeds
    async fn delete(&self, key: &str) -> Result<()>;

    /// Short backend identifier for logs
    fn backend_name(&self) -> &'static str;
}
