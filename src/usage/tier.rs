//! Subscription tiers and their static limits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A bound that may be unlimited
///
/// `Unlimited` always permits. It is never modelled as a large number, so
/// nothing can ever approach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    Finite(u64),
    Unlimited,
}

impl Limit {
    /// `true` when `count` is strictly below the bound
    pub fn permits(&self, count: u64) -> bool {
        match self {
            Limit::Finite(max) => count < *max,
            Limit::Unlimited => true,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    pub fn finite(&self) -> Option<u64> {
        match self {
            Limit::Finite(max) => Some(*max),
            Limit::Unlimited => None,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(max) => write!(f, "{}", max),
            Limit::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Gated product features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Csv,
    Sheets,
    Postgres,
    Mysql,
    Api,
    Team,
    PdfExport,
    Whitelabel,
    ApiAccess,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Csv => "csv",
            Feature::Sheets => "sheets",
            Feature::Postgres => "postgres",
            Feature::Mysql => "mysql",
            Feature::Api => "api",
            Feature::Team => "team",
            Feature::PdfExport => "pdf_export",
            Feature::Whitelabel => "whitelabel",
            Feature::ApiAccess => "api_access",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Starter,
    Pro,
    Agency,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Starter, Tier::Pro, Tier::Agency];

    /// Static limits for this tier
    pub fn limits(&self) -> &'static TierLimits {
        match self {
            Tier::Starter => &STARTER_LIMITS,
            Tier::Pro => &PRO_LIMITS,
            Tier::Agency => &AGENCY_LIMITS,
        }
    }

    /// Next tier up, `None` at the top
    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Starter => Some(Tier::Pro),
            Tier::Pro => Some(Tier::Agency),
            Tier::Agency => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Agency => "agency",
        }
    }

    /// Display name used in user-facing copy
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Starter => "Starter",
            Tier::Pro => "Pro",
            Tier::Agency => "Agency",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Ok(Tier::Starter),
            "pro" => Ok(Tier::Pro),
            "agency" => Ok(Tier::Agency),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Per-tier limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    pub queries_per_month: u64,
    /// Cap on unused queries carried into the next period
    pub max_rollover: u64,
    pub max_data_sources: Limit,
    pub max_columns: u64,
    pub max_users: Limit,
    pub features: &'static [Feature],
}

impl TierLimits {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

static STARTER_LIMITS: TierLimits = TierLimits {
    queries_per_month: 50,
    max_rollover: 100,
    max_data_sources: Limit::Finite(5),
    max_columns: 10,
    max_users: Limit::Finite(1),
    features: &[Feature::Csv],
};

static PRO_LIMITS: TierLimits = TierLimits {
    queries_per_month: 150,
    max_rollover: 300,
    max_data_sources: Limit::Finite(15),
    max_columns: 25,
    max_users: Limit::Finite(5),
    features: &[
        Feature::Csv,
        Feature::Sheets,
        Feature::Postgres,
        Feature::Mysql,
        Feature::Team,
        Feature::PdfExport,
    ],
};

static AGENCY_LIMITS: TierLimits = TierLimits {
    queries_per_month: 300,
    max_rollover: 600,
    max_data_sources: Limit::Unlimited,
    max_columns: 50,
    max_users: Limit::Unlimited,
    features: &[
        Feature::Csv,
        Feature::Sheets,
        Feature::Postgres,
        Feature::Mysql,
        Feature::Api,
        Feature::Team,
        Feature::PdfExport,
        Feature::Whitelabel,
        Feature::ApiAccess,
    ],
};
