//! Tier-limit gating for billable queries
//!
//! The gate is stateless: it classifies a [`UsageRecord`] snapshot and
//! computes the post-reset snapshot, but never writes anything. Mutation
//! belongs to the [`UsageLedger`](crate::usage::UsageLedger).
//!
//! Callers must run [`UsageGate::reset_if_needed`] (or the ledger's
//! `reset_if_past_due`) before [`UsageGate::can_make_query`] whenever the
//! snapshot may straddle a billing boundary.

use crate::usage::record::UsageRecord;
use crate::usage::tier::{Feature, Limit, Tier};
use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remaining queries at or below this are critical
pub const CRITICAL_THRESHOLD: u64 = 5;

/// Remaining queries at or below this (and above critical) are a warning
pub const WARNING_THRESHOLD: u64 = 15;

/// Quota health shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Ok,
    Warning,
    Critical,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStatus::Ok => write!(f, "ok"),
            QueryStatus::Warning => write!(f, "warning"),
            QueryStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Queries left in the current period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Remaining {
    Finite(u64),
    Unlimited,
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Finite(n) => write!(f, "{}", n),
            Remaining::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// What the user tried to do when a tier limit stopped them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradeReason {
    DataSources,
    Columns,
    Queries,
    Sheets,
    Database,
    Team,
    Whitelabel,
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct UsageGate {
    rollover: bool,
}

impl UsageGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry unused quota (capped by the tier's `max_rollover`) across resets
    pub fn with_rollover(mut self, enabled: bool) -> Self {
        self.rollover = enabled;
        self
    }

    pub fn rollover_enabled(&self) -> bool {
        self.rollover
    }

    /// Cache hits are always free; otherwise `used < limit`
    pub fn can_make_query(&self, usage: &UsageRecord, is_cached_answer: bool) -> bool {
        if is_cached_answer {
            return true;
        }
        usage.queries_limit.permits(usage.queries_used)
    }

    pub fn remaining_queries(&self, usage: &UsageRecord) -> Remaining {
        match usage.queries_limit {
            Limit::Finite(limit) => Remaining::Finite(limit.saturating_sub(usage.queries_used)),
            Limit::Unlimited => Remaining::Unlimited,
        }
    }

    pub fn query_status(&self, usage: &UsageRecord) -> QueryStatus {
        match self.remaining_queries(usage) {
            Remaining::Unlimited => QueryStatus::Ok,
            Remaining::Finite(n) if n <= CRITICAL_THRESHOLD => QueryStatus::Critical,
            Remaining::Finite(n) if n <= WARNING_THRESHOLD => QueryStatus::Warning,
            Remaining::Finite(_) => QueryStatus::Ok,
        }
    }

    /// Snapshot as of `now`, with counters reset if the boundary has passed
    ///
    /// The new reset date is the first whole-month step from the old one
    /// that lies strictly after `now`, so a record left stale across several
    /// periods lands on the next future boundary.
    pub fn reset_if_needed(&self, usage: &UsageRecord, now: DateTime<Utc>) -> UsageRecord {
        if now < usage.reset_date {
            return usage.clone();
        }

        let (periods, reset_date) = next_boundary_after(usage.reset_date, now);

        let queries_limit = if self.rollover {
            rollover_limit(usage, periods)
        } else {
            usage.queries_limit
        };

        UsageRecord {
            tier: usage.tier,
            queries_used: 0,
            queries_limit,
            reset_date,
        }
    }

    pub fn can_add_data_source(&self, tier: Tier, current_count: u64) -> bool {
        tier.limits().max_data_sources.permits(current_count)
    }

    pub fn can_use_feature(&self, tier: Tier, feature: Feature) -> bool {
        tier.limits().has_feature(feature)
    }

    pub fn can_select_columns(&self, tier: Tier, selected_count: u64) -> bool {
        selected_count <= tier.limits().max_columns
    }

    /// Upsell copy, `None` on the top tier
    pub fn upgrade_message(&self, tier: Tier, reason: UpgradeReason) -> Option<String> {
        let next = tier.next()?.display_name();

        let message = match reason {
            UpgradeReason::DataSources => format!("Upgrade to {} for more data sources", next),
            UpgradeReason::Columns => format!("Upgrade to {} to select more columns", next),
            UpgradeReason::Queries => format!("Upgrade to {} for more monthly queries", next),
            UpgradeReason::Sheets => "Upgrade to Pro to connect Google Sheets".to_string(),
            UpgradeReason::Database => "Upgrade to Pro to connect databases".to_string(),
            UpgradeReason::Team => "Upgrade to Pro for team collaboration".to_string(),
            UpgradeReason::Whitelabel => "Upgrade to Agency for white-label features".to_string(),
            UpgradeReason::Other => format!("Upgrade to {} to unlock this feature", next),
        };

        Some(message)
    }

    /// Whole days until the reset, rounded up, never negative
    pub fn days_until_reset(&self, usage: &UsageRecord, now: DateTime<Utc>) -> i64 {
        let remaining = usage.reset_date - now;
        if remaining <= chrono::Duration::zero() {
            return 0;
        }
        let whole = remaining.num_days();
        if remaining > chrono::Duration::days(whole) {
            whole + 1
        } else {
            whole
        }
    }
}

/// `(months_advanced, boundary)` for the first month step from `anchor`
/// strictly after `now`. Each candidate is computed from `anchor` itself so
/// day-of-month clamping (31st -> 28th) never accumulates.
fn next_boundary_after(anchor: DateTime<Utc>, now: DateTime<Utc>) -> (u32, DateTime<Utc>) {
    let month_gap = (now.year() - anchor.year()) * 12 + now.month() as i32 - anchor.month() as i32;
    let mut months = month_gap.max(1) as u32;

    loop {
        match anchor.checked_add_months(Months::new(months)) {
            Some(candidate) if candidate > now => return (months, candidate),
            Some(_) => months += 1,
            // Past the representable range; nothing later exists
            None => return (months, DateTime::<Utc>::MAX_UTC),
        }
    }
}

fn rollover_limit(usage: &UsageRecord, periods: u32) -> Limit {
    let used = usage.queries_used;
    let Limit::Finite(limit) = usage.queries_limit else {
        return Limit::Unlimited;
    };

    let tier = usage.tier.limits();
    let mut carry = limit.saturating_sub(used).min(tier.max_rollover);
    // Periods skipped entirely went unused in full
    for _ in 1..periods {
        carry = tier
            .queries_per_month
            .saturating_add(carry)
            .min(tier.max_rollover);
    }

    Limit::Finite(tier.queries_per_month + carry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(used: u64, limit: Limit) -> UsageRecord {
        UsageRecord::new(Tier::Starter, used, limit, ts(2026, 11, 1))
    }

    #[test]
    fn test_can_make_query() {
        let gate = UsageGate::new();

        assert!(gate.can_make_query(&record(49, Limit::Finite(50)), false));
        assert!(!gate.can_make_query(&record(50, Limit::Finite(50)), false));
        assert!(!gate.can_make_query(&record(51, Limit::Finite(50)), false));
        assert!(gate.can_make_query(&record(1_000, Limit::Finite(50)), true));
        assert!(gate.can_make_query(&record(1_000_000, Limit::Unlimited), false));
        assert!(!gate.can_make_query(&record(0, Limit::Finite(0)), false));
    }

    #[test]
    fn test_remaining_queries() {
        let gate = UsageGate::new();

        assert_eq!(gate.remaining_queries(&record(49, Limit::Finite(50))), Remaining::Finite(1));
        assert_eq!(gate.remaining_queries(&record(80, Limit::Finite(50))), Remaining::Finite(0));
        assert_eq!(gate.remaining_queries(&record(5, Limit::Unlimited)), Remaining::Unlimited);
    }

    #[test]
    fn test_status_thresholds() {
        let gate = UsageGate::new();
        let status_for = |remaining: u64| gate.query_status(&record(100 - remaining, Limit::Finite(100)));

        assert_eq!(status_for(0), QueryStatus::Critical);
        assert_eq!(status_for(5), QueryStatus::Critical);
        assert_eq!(status_for(6), QueryStatus::Warning);
        assert_eq!(status_for(15), QueryStatus::Warning);
        assert_eq!(status_for(16), QueryStatus::Ok);
        assert_eq!(gate.query_status(&record(10_000, Limit::Unlimited)), QueryStatus::Ok);
    }

    #[test]
    fn test_no_reset_before_boundary() {
        let gate = UsageGate::new();
        let usage = record(30, Limit::Finite(50));

        let same = gate.reset_if_needed(&usage, ts(2026, 10, 31));
        assert_eq!(same, usage);
    }

    #[test]
    fn test_reset_exactly_at_boundary() {
        let gate = UsageGate::new();
        let usage = record(50, Limit::Finite(50));

        let reset = gate.reset_if_needed(&usage, ts(2026, 11, 1));
        assert_eq!(reset.queries_used, 0);
        assert_eq!(reset.reset_date, ts(2026, 12, 1));
        assert_eq!(reset.queries_limit, Limit::Finite(50));
    }

    #[test]
    fn test_reset_after_long_downtime() {
        let gate = UsageGate::new();
        let usage = record(12, Limit::Finite(50));
        let now = Utc.with_ymd_and_hms(2027, 3, 15, 8, 30, 0).unwrap();

        let reset = gate.reset_if_needed(&usage, now);
        assert_eq!(reset.queries_used, 0);
        assert_eq!(reset.reset_date, ts(2027, 4, 1));
        assert!(reset.reset_date > now);
    }

    #[test]
    fn test_reset_keeps_original_day_anchor() {
        let gate = UsageGate::new();
        let usage = UsageRecord::new(Tier::Pro, 3, Limit::Finite(150), ts(2027, 1, 31));

        let feb = gate.reset_if_needed(&usage, ts(2027, 2, 1));
        assert_eq!(feb.reset_date, ts(2027, 2, 28));

        let later = gate.reset_if_needed(&usage, ts(2027, 3, 1));
        assert_eq!(later.reset_date, ts(2027, 3, 31));
    }

    #[test]
    fn test_rollover_carries_unused_quota() {
        let gate = UsageGate::new().with_rollover(true);
        let usage = record(20, Limit::Finite(50));

        let reset = gate.reset_if_needed(&usage, ts(2026, 11, 2));
        assert_eq!(reset.queries_limit, Limit::Finite(80));
        assert_eq!(reset.queries_used, 0);
    }

    #[test]
    fn test_rollover_is_capped() {
        let gate = UsageGate::new().with_rollover(true);
        let usage = record(0, Limit::Finite(150));

        // 150 unused, capped at 100
        let reset = gate.reset_if_needed(&usage, ts(2026, 11, 2));
        assert_eq!(reset.queries_limit, Limit::Finite(150));

        // Skipped periods accumulate up to the cap too
        let stale = gate.reset_if_needed(&record(50, Limit::Finite(50)), ts(2027, 2, 10));
        assert_eq!(stale.queries_limit, Limit::Finite(150));
    }

    #[test]
    fn test_rollover_disabled_by_default() {
        let gate = UsageGate::new();
        assert!(!gate.rollover_enabled());
        let reset = gate.reset_if_needed(&record(0, Limit::Finite(50)), ts(2026, 11, 2));
        assert_eq!(reset.queries_limit, Limit::Finite(50));
    }

    #[test]
    fn test_data_source_and_column_limits() {
        let gate = UsageGate::new();

        assert!(gate.can_add_data_source(Tier::Starter, 4));
        assert!(!gate.can_add_data_source(Tier::Starter, 5));
        assert!(gate.can_add_data_source(Tier::Pro, 14));
        assert!(!gate.can_add_data_source(Tier::Pro, 15));
        assert!(gate.can_add_data_source(Tier::Agency, u64::MAX));

        assert!(gate.can_select_columns(Tier::Starter, 10));
        assert!(!gate.can_select_columns(Tier::Starter, 11));
    }

    #[test]
    fn test_feature_gating() {
        let gate = UsageGate::new();

        assert!(gate.can_use_feature(Tier::Starter, Feature::Csv));
        assert!(!gate.can_use_feature(Tier::Starter, Feature::Sheets));
        assert!(gate.can_use_feature(Tier::Pro, Feature::Mysql));
        assert!(!gate.can_use_feature(Tier::Pro, Feature::ApiAccess));
        assert!(gate.can_use_feature(Tier::Agency, Feature::ApiAccess));
    }

    #[test]
    fn test_upgrade_message() {
        let gate = UsageGate::new();

        assert_eq!(
            gate.upgrade_message(Tier::Starter, UpgradeReason::Queries).as_deref(),
            Some("Upgrade to Pro for more monthly queries")
        );
        assert_eq!(
            gate.upgrade_message(Tier::Pro, UpgradeReason::DataSources).as_deref(),
            Some("Upgrade to Agency for more data sources")
        );
        assert_eq!(
            gate.upgrade_message(Tier::Pro, UpgradeReason::Sheets).as_deref(),
            Some("Upgrade to Pro to connect Google Sheets")
        );
        assert!(gate.upgrade_message(Tier::Agency, UpgradeReason::Queries).is_none());
    }

    #[test]
    fn test_days_until_reset() {
        let gate = UsageGate::new();
        let usage = record(0, Limit::Finite(50));

        assert_eq!(gate.days_until_reset(&usage, ts(2026, 10, 31)), 1);
        assert_eq!(
            gate.days_until_reset(&usage, Utc.with_ymd_and_hms(2026, 10, 29, 12, 0, 0).unwrap()),
            3
        );
        assert_eq!(gate.days_until_reset(&usage, ts(2026, 11, 1)), 0);
        assert_eq!(gate.days_until_reset(&usage, ts(2026, 12, 5)), 0);
    }
}
