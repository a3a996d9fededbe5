//! Usage ledger: the owner of per-user counters

use crate::error::{QueryCacheError, Result};
use crate::usage::gate::UsageGate;
use crate::usage::record::UsageRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Storage for per-user usage counters
///
/// Consistency is only required per user; implementations need no
/// cross-user coordination.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Current snapshot for `user_id`
    async fn usage(&self, user_id: &str) -> Result<UsageRecord>;

    /// Record one billable query
    async fn increment_used(&self, user_id: &str) -> Result<()>;

    /// Apply a pending period reset and return the resulting snapshot
    ///
    /// `gate` computes the post-reset record, so its rollover mode decides
    /// the new limit.
    async fn reset_if_past_due(
        &self,
        user_id: &str,
        gate: &UsageGate,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord>;
}

/// Ledger held in process memory
#[derive(Clone, Default)]
pub struct InMemoryUsageLedger {
    records: Arc<RwLock<HashMap<String, UsageRecord>>>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a user's record
    pub async fn insert(&self, user_id: impl Into<String>, record: UsageRecord) {
        self.records.write().await.insert(user_id.into(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn unknown(user_id: &str) -> QueryCacheError {
    QueryCacheError::UnknownUser {
        user_id: user_id.to_string(),
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn usage(&self, user_id: &str) -> Result<UsageRecord> {
        self.records
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| unknown(user_id))
    }

    async fn increment_used(&self, user_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(user_id).ok_or_else(|| unknown(user_id))?;
        *record = record.incremented();
        debug!("User {} used {} queries", user_id, record.queries_used);
        Ok(())
    }

    async fn reset_if_past_due(
        &self,
        user_id: &str,
        gate: &UsageGate,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(user_id).ok_or_else(|| unknown(user_id))?;

        let updated = gate.reset_if_needed(record, now);
        if updated.reset_date != record.reset_date {
            info!(
                "Reset usage for {} (next reset {})",
                user_id, updated.reset_date
            );
            *record = updated;
        }

        Ok(record.clone())
    }
}
