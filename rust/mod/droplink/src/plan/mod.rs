//! Subscription tiers and what each one unlocks.
//!
//! [`features`] is the single entitlement table; [`gate`] answers
//! "may this plan use feature X, and if not, which plan would it need"
//! by reading that same table.

pub mod features;
pub mod gate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use features::{can_add_link, plan_features, AnalyticsTier, Limit, PlanFeatures};
pub use gate::{check_feature_access, Feature, FeatureAccess};

/// Subscription tier. Ordering follows the upgrade path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    #[serde(alias = "basic")]
    Starter,
    Pro,
    #[serde(alias = "elite")]
    Premium,
}

impl PlanTier {
    /// All tiers, cheapest first.
    pub const ALL: [PlanTier; 4] = [
        PlanTier::Free,
        PlanTier::Starter,
        PlanTier::Pro,
        PlanTier::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Premium => "premium",
        }
    }

    /// Lenient parse for lookups: unknown names fall back to `Free`.
    pub fn parse(name: &str) -> PlanTier {
        name.parse().unwrap_or(PlanTier::Free)
    }

    /// Whether this tier skips the watch-an-ad requirement.
    pub fn bypasses_ads(&self) -> bool {
        plan_features(*self).ad_free
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse for user input. `basic` and `elite` are accepted as the
/// names older clients use for `starter` and `premium`.
impl FromStr for PlanTier {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "starter" | "basic" => Ok(PlanTier::Starter),
            "pro" => Ok(PlanTier::Pro),
            "premium" | "elite" => Ok(PlanTier::Premium),
            _ => Err(UnknownPlan(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan '{0}'")]
pub struct UnknownPlan(pub String);
