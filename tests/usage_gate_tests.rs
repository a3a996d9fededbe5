//! Integration tests for tier limits and quota gating

use chrono::{DateTime, Duration, TimeZone, Utc};
use querycache::usage::{
    Feature, InMemoryUsageLedger, Limit, QueryStatus, Remaining, Tier, UsageGate, UsageLedger,
    UsageRecord,
};

fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[test]
fn test_gate_monotonicity() {
    let gate = UsageGate::new();
    let reset = ts(2026, 11, 1);

    for limit in [0u64, 1, 50, 300] {
        for used in 0..=limit + 2 {
            let usage = UsageRecord::new(Tier::Pro, used, Limit::Finite(limit), reset);
            assert_eq!(gate.can_make_query(&usage, false), used < limit);
            assert!(gate.can_make_query(&usage, true));
        }
    }
}

#[test]
fn test_infinite_limit() {
    let gate = UsageGate::new();
    let usage = UsageRecord::new(Tier::Agency, 1_000_000, Limit::Unlimited, ts(2026, 11, 1));

    assert!(gate.can_make_query(&usage, false));
    assert_eq!(gate.remaining_queries(&usage), Remaining::Unlimited);
    assert_eq!(gate.query_status(&usage), QueryStatus::Ok);

    let maxed = UsageRecord::new(Tier::Agency, u64::MAX, Limit::Unlimited, ts(2026, 11, 1));
    assert!(gate.can_make_query(&maxed, false));
}

#[test]
fn test_status_thresholds() {
    let gate = UsageGate::new();
    let with_remaining = |remaining: u64| {
        UsageRecord::new(Tier::Starter, 50 - remaining, Limit::Finite(50), ts(2026, 11, 1))
    };

    assert_eq!(gate.query_status(&with_remaining(5)), QueryStatus::Critical);
    assert_eq!(gate.query_status(&with_remaining(6)), QueryStatus::Warning);
    assert_eq!(gate.query_status(&with_remaining(15)), QueryStatus::Warning);
    assert_eq!(gate.query_status(&with_remaining(16)), QueryStatus::Ok);
}

#[test]
fn test_reset_correctness() {
    let gate = UsageGate::new();
    let original = ts(2026, 3, 1);
    let usage = UsageRecord::new(Tier::Starter, 37, Limit::Finite(50), original);
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 14, 0, 0).unwrap();

    let reset = gate.reset_if_needed(&usage, now);

    assert_eq!(reset.queries_used, 0);
    assert!(reset.reset_date > now);
    assert_eq!(reset.reset_date, ts(2026, 11, 1));
    // Still on the original day-of-month and time-of-day
    assert_eq!(reset.reset_date.time(), original.time());
    assert!(reset.reset_date - Duration::days(31) <= now);
}

#[test]
fn test_reset_instant_after_boundary() {
    let gate = UsageGate::new();
    let boundary = ts(2026, 11, 1);
    let usage = UsageRecord::new(Tier::Starter, 50, Limit::Finite(50), boundary);

    assert!(!gate.can_make_query(&usage, false));

    let just_after = boundary + Duration::milliseconds(1);
    let fresh = gate.reset_if_needed(&usage, just_after);
    assert!(gate.can_make_query(&fresh, false));
    assert_eq!(fresh.reset_date, ts(2026, 12, 1));
}

#[test]
fn test_starter_scenario() {
    let gate = UsageGate::new();
    let mut usage = UsageRecord::for_tier(Tier::Starter, ts(2026, 11, 1));
    usage.queries_used = 49;

    assert!(gate.can_make_query(&usage, false));
    assert_eq!(gate.remaining_queries(&usage), Remaining::Finite(1));
    assert_eq!(gate.query_status(&usage), QueryStatus::Critical);

    let usage = usage.incremented();
    assert_eq!(usage.queries_used, 50);
    assert!(!gate.can_make_query(&usage, false));
    assert_eq!(gate.remaining_queries(&usage), Remaining::Finite(0));
    // Cached answers stay free
    assert!(gate.can_make_query(&usage, true));
}

#[test]
fn test_tier_resource_limits() {
    let gate = UsageGate::new();

    assert!(gate.can_add_data_source(Tier::Starter, 0));
    assert!(!gate.can_add_data_source(Tier::Starter, 5));
    assert!(gate.can_add_data_source(Tier::Agency, 10_000));

    assert!(gate.can_use_feature(Tier::Pro, Feature::Sheets));
    assert!(!gate.can_use_feature(Tier::Starter, Feature::Postgres));
}

#[tokio::test]
async fn test_ledger_lifecycle() {
    let ledger = InMemoryUsageLedger::new();
    let gate = UsageGate::new();
    ledger
        .insert("u1", UsageRecord::for_tier(Tier::Starter, ts(2026, 11, 1)))
        .await;

    for _ in 0..50 {
        let usage = ledger.reset_if_past_due("u1", &gate, ts(2026, 10, 16)).await.unwrap();
        assert!(gate.can_make_query(&usage, false));
        ledger.increment_used("u1").await.unwrap();
    }

    let exhausted = ledger.reset_if_past_due("u1", &gate, ts(2026, 10, 31)).await.unwrap();
    assert!(!gate.can_make_query(&exhausted, false));

    let next_period = ledger.reset_if_past_due("u1", &gate, ts(2026, 11, 1)).await.unwrap();
    assert_eq!(next_period.queries_used, 0);
    assert_eq!(next_period.reset_date, ts(2026, 12, 1));
    assert!(gate.can_make_query(&next_period, false));
}

#[tokio::test]
async fn test_ledger_with_rollover() {
    let ledger = InMemoryUsageLedger::new();
    let gate = UsageGate::new().with_rollover(true);
    ledger
        .insert(
            "u1",
            UsageRecord::new(Tier::Pro, 100, Limit::Finite(150), ts(2026, 11, 1)),
        )
        .await;

    let usage = ledger.reset_if_past_due("u1", &gate, ts(2026, 11, 3)).await.unwrap();
    assert_eq!(usage.queries_limit, Limit::Finite(200));
    assert_eq!(usage.queries_used, 0);
}
