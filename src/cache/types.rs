//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - `query:{source}:{fingerprint}:{hash}` for query results
pub type CacheKey = String;

/// Statistics for monitoring the query result cache
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses (including failed reads)
    pub misses: u64,

    /// Backend or serialization failures that were swallowed
    pub errors: u64,

    /// Successful writes
    pub writes: u64,

    /// Successful explicit deletes
    pub deletes: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Total lookups served
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, writes: {}, deletes: {}, errors: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.writes,
            self.deletes,
            self.errors
        )
    }
}

/// Counters kept by the in-memory backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemoryStoreStats {
    /// Number of entries currently stored
    pub entries: usize,

    /// Total size of stored data in bytes
    pub size_bytes: usize,

    /// Number of evictions due to size or count limits
    pub evictions_size: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,
}

impl MemoryStoreStats {
    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}
