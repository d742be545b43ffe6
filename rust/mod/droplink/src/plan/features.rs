use serde::Serialize;

use super::PlanTier;

/// A numeric quota. `Limited(n) < Unlimited`, so comparing two limits
/// answers "is this plan at least as generous".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Limited(u32),
    Unlimited,
}

impl Limit {
    /// Whether one more item fits when `current` already exist.
    pub fn allows_another(&self, current: usize) -> bool {
        match self {
            Limit::Limited(max) => current < *max as usize,
            Limit::Unlimited => true,
        }
    }
}

/// Depth of the analytics dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsTier {
    /// Totals per event kind.
    Basic,
    /// Plus daily series and top referrers.
    Advanced,
    /// Plus per-link click counts.
    Full,
}

/// Everything a plan unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFeatures {
    pub max_links: Limit,
    pub max_templates: Limit,
    pub analytics: AnalyticsTier,
    pub custom_themes: bool,
    pub remove_branding: bool,
    pub qr_code: bool,
    pub link_scheduling: bool,
    pub custom_domain: bool,
    pub pi_tips: bool,
    pub email_capture: bool,
    pub seo_tools: bool,
    pub ad_free: bool,
    pub priority_support: bool,
    pub api_access: bool,
}

const FREE: PlanFeatures = PlanFeatures {
    max_links: Limit::Limited(1),
    max_templates: Limit::Limited(3),
    analytics: AnalyticsTier::Basic,
    custom_themes: false,
    remove_branding: false,
    qr_code: false,
    link_scheduling: false,
    custom_domain: false,
    pi_tips: true,
    email_capture: false,
    seo_tools: false,
    ad_free: false,
    priority_support: false,
    api_access: false,
};

const STARTER: PlanFeatures = PlanFeatures {
    max_links: Limit::Unlimited,
    max_templates: Limit::Limited(10),
    custom_themes: true,
    qr_code: true,
    seo_tools: true,
    ..FREE
};

const PRO: PlanFeatures = PlanFeatures {
    max_templates: Limit::Limited(30),
    analytics: AnalyticsTier::Advanced,
    remove_branding: true,
    link_scheduling: true,
    email_capture: true,
    ..STARTER
};

const PREMIUM: PlanFeatures = PlanFeatures {
    max_templates: Limit::Unlimited,
    analytics: AnalyticsTier::Full,
    custom_domain: true,
    ad_free: true,
    priority_support: true,
    api_access: true,
    ..PRO
};

/// Entitlements for `plan`.
pub const fn plan_features(plan: PlanTier) -> PlanFeatures {
    match plan {
        PlanTier::Free => FREE,
        PlanTier::Starter => STARTER,
        PlanTier::Pro => PRO,
        PlanTier::Premium => PREMIUM,
    }
}

/// Whether a profile on `plan` that already has `current_count` links may
/// add one more.
pub fn can_add_link(plan: PlanTier, current_count: usize) -> bool {
    plan_features(plan).max_links.allows_another(current_count)
}
