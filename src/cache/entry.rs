//! Stored entry with TTL support for the in-memory backend

use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A serialized value plus its expiry
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The cache key
    pub key: CacheKey,

    /// Opaque serialized blob
    pub value: Vec<u8>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// When the entry stops being readable
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    /// Create a new entry expiring `ttl` from now
    pub fn new(key: CacheKey, value: Vec<u8>, ttl: Duration) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            key,
            value,
            created_at: now,
            expires_at,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        if self.is_expired_at(now) {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Approximate size: key + value + bookkeeping overhead
    pub fn calculate_size(&self) -> usize {
        self.key.len() + self.value.len() + 2 * std::mem::size_of::<DateTime<Utc>>()
    }
}
