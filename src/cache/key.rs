//! Cache key derivation for natural-language queries
//!
//! Keys have the shape `query:{data_source_id}:{fingerprint}:{prompt_hash}`.
//! Prompts are normalized before hashing so that requests differing only in
//! case, spacing or `. , ! ?` punctuation share one cache entry. The
//! fingerprint changes whenever a data source's content is replaced, which
//! leaves every older entry for that source unreachable.

use crate::cache::types::CacheKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Namespace for query result keys
pub const QUERY_KEY_NAMESPACE: &str = "query";

/// Hex characters of the SHA-256 digest kept in the key (64 bits)
const PROMPT_HASH_LEN: usize = 16;

/// Lower-case, collapse whitespace, strip `. , ! ?`, trim
pub fn normalize_prompt(prompt: &str) -> String {
    let lowered = prompt.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '!' | '?'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Stable hash of the normalized prompt
pub fn prompt_hash(prompt: &str) -> String {
    let digest = Sha256::digest(normalize_prompt(prompt).as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(PROMPT_HASH_LEN);
    encoded
}

/// Build the cache key for a query against a data source
pub fn derive_key(data_source_id: &str, prompt: &str, fingerprint: &str) -> CacheKey {
    format!(
        "{}:{}:{}:{}",
        QUERY_KEY_NAMESPACE,
        data_source_id,
        fingerprint,
        prompt_hash(prompt)
    )
}

/// Opaque content version of a data source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Mint a fresh fingerprint for newly replaced content
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
