use serde::Serialize;

use super::features::{plan_features, AnalyticsTier, Limit, PlanFeatures};
use super::PlanTier;

/// A gated capability, named the way the web client asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    UnlimitedLinks,
    AdvancedAnalytics,
    FullAnalytics,
    CustomThemes,
    RemoveBranding,
    QrCode,
    LinkScheduling,
    CustomDomain,
    PiTips,
    EmailCapture,
    SeoTools,
    AdFree,
    PrioritySupport,
    ApiAccess,
}

impl Feature {
    pub const ALL: [Feature; 14] = [
        Feature::UnlimitedLinks,
        Feature::AdvancedAnalytics,
        Feature::FullAnalytics,
        Feature::CustomThemes,
        Feature::RemoveBranding,
        Feature::QrCode,
        Feature::LinkScheduling,
        Feature::CustomDomain,
        Feature::PiTips,
        Feature::EmailCapture,
        Feature::SeoTools,
        Feature::AdFree,
        Feature::PrioritySupport,
        Feature::ApiAccess,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::UnlimitedLinks => "unlimited_links",
            Feature::AdvancedAnalytics => "advanced_analytics",
            Feature::FullAnalytics => "full_analytics",
            Feature::CustomThemes => "custom_themes",
            Feature::RemoveBranding => "remove_branding",
            Feature::QrCode => "qr_code",
            Feature::LinkScheduling => "link_scheduling",
            Feature::CustomDomain => "custom_domain",
            Feature::PiTips => "pi_tips",
            Feature::EmailCapture => "email_capture",
            Feature::SeoTools => "seo_tools",
            Feature::AdFree => "ad_free",
            Feature::PrioritySupport => "priority_support",
            Feature::ApiAccess => "api_access",
        }
    }

    /// Parse `custom_themes`, `custom-themes` or `customThemes`.
    pub fn parse(name: &str) -> Option<Feature> {
        let wanted = squash(name);
        Feature::ALL
            .into_iter()
            .find(|f| squash(f.name()) == wanted)
    }

    /// Whether `features` includes this capability.
    pub fn enabled_in(&self, features: &PlanFeatures) -> bool {
        match self {
            Feature::UnlimitedLinks => features.max_links == Limit::Unlimited,
            Feature::AdvancedAnalytics => features.analytics >= AnalyticsTier::Advanced,
            Feature::FullAnalytics => features.analytics >= AnalyticsTier::Full,
            Feature::CustomThemes => features.custom_themes,
            Feature::RemoveBranding => features.remove_branding,
            Feature::QrCode => features.qr_code,
            Feature::LinkScheduling => features.link_scheduling,
            Feature::CustomDomain => features.custom_domain,
            Feature::PiTips => features.pi_tips,
            Feature::EmailCapture => features.email_capture,
            Feature::SeoTools => features.seo_tools,
            Feature::AdFree => features.ad_free,
            Feature::PrioritySupport => features.priority_support,
            Feature::ApiAccess => features.api_access,
        }
    }

    /// Cheapest tier that includes this capability.
    pub fn required_plan(&self) -> PlanTier {
        PlanTier::ALL
            .into_iter()
            .find(|p| self.enabled_in(&plan_features(*p)))
            .unwrap_or(PlanTier::Premium)
    }
}

fn squash(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Answer to "may this plan use that feature".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccess {
    pub has_access: bool,
    /// Set only when access is denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_plan: Option<PlanTier>,
}

/// Check `feature_name` against `plan`.
///
/// Unknown names require `premium`.
pub fn check_feature_access(plan: PlanTier, feature_name: &str) -> FeatureAccess {
    let required = Feature::parse(feature_name)
        .map(|f| f.required_plan())
        .unwrap_or(PlanTier::Premium);
    if plan >= required {
        FeatureAccess {
            has_access: true,
            required_plan: None,
        }
    } else {
        FeatureAccess {
            has_access: false,
            required_plan: Some(required),
        }
    }
}
