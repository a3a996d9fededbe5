//! Per-user usage snapshot

use crate::usage::tier::{Limit, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billable query counters for one user and billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub tier: Tier,
    pub queries_used: u64,
    pub queries_limit: Limit,
    /// Counters reset once this instant is reached
    pub reset_date: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(tier: Tier, queries_used: u64, queries_limit: Limit, reset_date: DateTime<Utc>) -> Self {
        Self {
            tier,
            queries_used,
            queries_limit,
            reset_date,
        }
    }

    /// Fresh record with the tier's monthly allowance
    pub fn for_tier(tier: Tier, reset_date: DateTime<Utc>) -> Self {
        Self::new(
            tier,
            0,
            Limit::Finite(tier.limits().queries_per_month),
            reset_date,
        )
    }

    /// Copy with one more billable query recorded
    pub fn incremented(&self) -> Self {
        Self {
            queries_used: self.queries_used.saturating_add(1),
            ..self.clone()
        }
    }
}
