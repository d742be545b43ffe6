use serde::{Deserialize, Serialize};

use crate::model::Link;
use crate::plan::PlanTier;

/// Theme every plan may use.
pub const DEFAULT_THEME: &str = "default";

/// A user's public link-in-bio profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,

    /// Unique, lowercase, validated handle used in the public URL.
    pub username: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_plan")]
    pub plan: PlanTier,

    #[serde(default)]
    pub onboarding_completed: bool,

    /// Pi Network user id this profile signs in with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi_uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfile {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub pi_uid: Option<String>,
    #[serde(default)]
    pub pi_username: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// What a visitor sees at `/{username}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPage {
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub theme: String,
    /// Active links in display order.
    pub links: Vec<Link>,
    /// Whether to render the "made with Droplink" footer.
    pub show_branding: bool,
    /// Whether the tip button is offered.
    pub accepts_tips: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeUsername {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlan {
    pub plan: String,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_plan() -> PlanTier {
    PlanTier::Free
}
