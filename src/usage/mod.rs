//! # Tier limits and query quota
//!
//! - [`Tier`] / [`TierLimits`]: closed set of plans with a static limits table
//! - [`UsageRecord`]: one user's counters for the current billing period
//! - [`UsageGate`]: stateless classification (may I query, how many left,
//!   ok/warning/critical, post-reset snapshot)
//! - [`UsageLedger`]: the collaborator that owns and mutates the counters
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use querycache::usage::{QueryStatus, Remaining, Tier, UsageGate, UsageRecord};
//!
//! let reset = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
//! let mut usage = UsageRecord::for_tier(Tier::Starter, reset);
//! usage.queries_used = 49;
//!
//! let gate = UsageGate::new();
//! assert!(gate.can_make_query(&usage, false));
//! assert_eq!(gate.remaining_queries(&usage), Remaining::Finite(1));
//! assert_eq!(gate.query_status(&usage), QueryStatus::Critical);
//! ```

pub mod gate;
pub mod ledger;
pub mod record;
pub mod tier;

pub use gate::{QueryStatus, Remaining, UpgradeReason, UsageGate, CRITICAL_THRESHOLD, WARNING_THRESHOLD};
pub use ledger::{InMemoryUsageLedger, UsageLedger};
pub use record::UsageRecord;
pub use tier::{Feature, Limit, Tier, TierLimits};
