//! End-to-end flow for one natural-language query
//!
//! derive key -> cache lookup -> (miss) quota check -> analysis ->
//! cache store -> usage increment.
//!
//! A cache hit never touches the ledger, so it is free even for a user whose
//! quota is exhausted. The increment happens strictly after the analysis
//! succeeded; if the future is dropped earlier nothing is billed.

use crate::cache::{derive_key, CachedQueryResult, QueryResultCache, SingleFlight};
use crate::error::{QueryCacheError, Result};
use crate::usage::{QueryStatus, Remaining, UpgradeReason, UsageGate, UsageLedger, UsageRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One incoming question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// `None` for anonymous (demo) requests, which are never gated or billed
    pub user_id: Option<String>,
    pub data_source_id: String,
    pub fingerprint: String,
    pub prompt: String,
}

impl QueryRequest {
    pub fn new(
        user_id: Option<String>,
        data_source_id: impl Into<String>,
        fingerprint: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            data_source_id: data_source_id.into(),
            fingerprint: fingerprint.into(),
            prompt: prompt.into(),
        }
    }

    pub fn cache_key(&self) -> String {
        derive_key(&self.data_source_id, &self.prompt, &self.fingerprint)
    }
}

/// How a fresh answer is written to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Spawn the write and respond immediately
    #[default]
    Background,
    /// Finish the write before responding
    Awaited,
}

/// Quota view returned alongside a billed answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub record: UsageRecord,
    pub remaining: Remaining,
    pub status: QueryStatus,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Answered {
        answer: CachedQueryResult,
        /// `true` when served from cache (not billed)
        cached: bool,
        /// Post-increment usage; `None` for cache hits and anonymous requests
        usage: Option<UsageSummary>,
    },
    /// Quota exhausted; surface as a "limit reached" response
    LimitReached {
        reset_date: DateTime<Utc>,
        days_until_reset: i64,
        /// Always `Finite(0)` for a denied query
        remaining: Remaining,
        upgrade_message: Option<String>,
    },
}

impl QueryOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, QueryOutcome::Answered { cached: true, .. })
    }

    pub fn answer(&self) -> Option<&CachedQueryResult> {
        match self {
            QueryOutcome::Answered { answer, .. } => Some(answer),
            QueryOutcome::LimitReached { .. } => None,
        }
    }
}

pub struct QueryPipeline<L> {
    cache: QueryResultCache,
    ledger: Arc<L>,
    gate: UsageGate,
    write_mode: WriteMode,
    single_flight: Option<SingleFlight>,
}

impl<L: UsageLedger> QueryPipeline<L> {
    pub fn new(cache: QueryResultCache, ledger: Arc<L>) -> Self {
        Self {
            cache,
            ledger,
            gate: UsageGate::new(),
            write_mode: WriteMode::default(),
            single_flight: None,
        }
    }

    /// Gate used for both the quota check and period resets
    pub fn with_gate(mut self, gate: UsageGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// De-duplicate concurrent misses on the same key
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled.then(SingleFlight::new);
        self
    }

    pub fn cache(&self) -> &QueryResultCache {
        &self.cache
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn gate(&self) -> &UsageGate {
        &self.gate
    }

    pub async fn run<F, Fut>(&self, request: &QueryRequest, analyze: F) -> Result<QueryOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<CachedQueryResult>>,
    {
        self.run_at(request, Utc::now(), analyze).await
    }

    /// [`run`](Self::run) with an explicit clock for the quota check
    pub async fn run_at<F, Fut>(
        &self,
        request: &QueryRequest,
        now: DateTime<Utc>,
        analyze: F,
    ) -> Result<QueryOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<CachedQueryResult>>,
    {
        let key = request.cache_key();

        if let Some(answer) = self.cached_answer(&key).await {
            return Ok(answer);
        }

        let _flight = match &self.single_flight {
            Some(flights) => {
                let guard = flights.acquire(&key).await;
                // Another request may have filled the cache while we waited
                if let Some(answer) = self.cached_answer(&key).await {
                    return Ok(answer);
                }
                Some(guard)
            }
            None => None,
        };

        if let Some(user_id) = request.user_id.as_deref() {
            let usage = self
                .ledger
                .reset_if_past_due(user_id, &self.gate, now)
                .await?;
            if !self.gate.can_make_query(&usage, false) {
                warn!(
                    "Query limit reached for {} ({} of {})",
                    user_id, usage.queries_used, usage.queries_limit
                );
                return Ok(QueryOutcome::LimitReached {
                    reset_date: usage.reset_date,
                    days_until_reset: self.gate.days_until_reset(&usage, now),
                    remaining: self.gate.remaining_queries(&usage),
                    upgrade_message: self.gate.upgrade_message(usage.tier, UpgradeReason::Queries),
                });
            }
        }

        let answer = analyze().await.map_err(QueryCacheError::Analysis)?;

        match self.write_mode {
            WriteMode::Background => {
                let _ = self.cache.spawn_set(&key, &answer);
            }
            WriteMode::Awaited => self.cache.set(&key, &answer).await,
        }

        let usage = match request.user_id.as_deref() {
            Some(user_id) => Some(self.bill(user_id).await?),
            None => None,
        };

        info!("Answered query {} (uncached)", key);
        Ok(QueryOutcome::Answered {
            answer,
            cached: false,
            usage,
        })
    }

    async fn cached_answer(&self, key: &str) -> Option<QueryOutcome> {
        let answer = self.cache.get::<CachedQueryResult>(key).await?;
        debug!("Serving cached answer for {}", key);
        Some(QueryOutcome::Answered {
            answer,
            cached: true,
            usage: None,
        })
    }

    async fn bill(&self, user_id: &str) -> Result<UsageSummary> {
        self.ledger.increment_used(user_id).await?;
        let record = self.ledger.usage(user_id).await?;
        Ok(UsageSummary {
            remaining: self.gate.remaining_queries(&record),
            status: self.gate.query_status(&record),
            record,
        })
    }
}
