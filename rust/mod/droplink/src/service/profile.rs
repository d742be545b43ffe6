use tracing::info;

use droplink_core::{merge_patch, new_id};
use droplink_sql::Value;

use crate::model::{CreateProfile, Profile, PublicPage, DEFAULT_THEME};
use crate::plan::{plan_features, Feature, PlanTier};
use crate::service::username::{validate_username, USERNAME_TAKEN};
use crate::service::{check_len, non_empty, DroplinkError, DroplinkService};

const MAX_DISPLAY_NAME: usize = 50;
const MAX_BIO: usize = 160;
const MAX_THEME: usize = 32;

impl DroplinkService {
    fn profile_columns(profile: &Profile) -> Vec<(&'static str, Value)> {
        vec![
            ("username", Value::Text(profile.username.clone())),
            ("pi_uid", profile.pi_uid.clone().into()),
            ("plan", Value::Text(profile.plan.as_str().to_string())),
            ("updated_at", Value::Text(profile.updated_at.clone())),
        ]
    }

    /// Reject profile fields that are out of bounds or not in the plan.
    fn validate_profile(profile: &Profile) -> Result<(), DroplinkError> {
        check_len("displayName", &profile.display_name, 1, MAX_DISPLAY_NAME)?;
        if let Some(bio) = &profile.bio {
            check_len("bio", bio, 0, MAX_BIO)?;
        }
        check_len("theme", &profile.theme, 1, MAX_THEME)?;
        if profile.theme != DEFAULT_THEME && !Feature::CustomThemes.enabled_in(&plan_features(profile.plan)) {
            return Err(DroplinkError::PlanLimit(format!(
                "theme '{}' requires the {} plan",
                profile.theme,
                Feature::CustomThemes.required_plan()
            )));
        }
        Ok(())
    }

    /// Create a profile on the free plan.
    pub fn create_profile(&self, input: CreateProfile) -> Result<Profile, DroplinkError> {
        let username = validate_username(&input.username)?;
        if self.username_taken(&username)? {
            return Err(DroplinkError::Conflict(USERNAME_TAKEN.into()));
        }

        let now = self.timestamp();
        let profile = Profile {
            id: new_id(),
            display_name: non_empty(input.display_name).unwrap_or_else(|| username.clone()),
            username,
            bio: non_empty(input.bio),
            avatar_url: non_empty(input.avatar_url),
            theme: DEFAULT_THEME.to_string(),
            plan: PlanTier::Free,
            onboarding_completed: false,
            pi_uid: non_empty(input.pi_uid),
            pi_username: non_empty(input.pi_username),
            wallet_address: non_empty(input.wallet_address),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        Self::validate_profile(&profile)?;

        let mut columns = Self::profile_columns(&profile);
        columns.push(("created_at", Value::Text(now)));
        self.insert_record("profiles", &profile.id, &profile, &columns)?;

        info!(profile_id = %profile.id, username = %profile.username, "profile created");
        Ok(profile)
    }

    pub fn get_profile(&self, id: &str) -> Result<Profile, DroplinkError> {
        self.get_record("profiles", id)
    }

    /// Look up by username, case-insensitively.
    pub fn get_profile_by_username(&self, username: &str) -> Result<Profile, DroplinkError> {
        let lower = username.trim().to_ascii_lowercase();
        self.find_record("profiles", "username", Value::Text(lower))?
            .ok_or_else(|| DroplinkError::NotFound(format!("profile '{}' not found", username.trim())))
    }

    pub fn find_profile_by_pi_uid(&self, pi_uid: &str) -> Result<Option<Profile>, DroplinkError> {
        self.find_record("profiles", "pi_uid", Value::Text(pi_uid.to_string()))
    }

    /// Update editable fields with JSON merge-patch semantics.
    ///
    /// Identity, username and plan have their own operations and are
    /// preserved here.
    pub fn update_profile(&self, id: &str, patch: serde_json::Value) -> Result<Profile, DroplinkError> {
        let current = self.get_profile(id)?;

        let mut base = serde_json::to_value(&current).map_err(|e| DroplinkError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        let mut updated: Profile = serde_json::from_value(base)
            .map_err(|e| DroplinkError::Validation(format!("invalid profile: {}", e)))?;

        updated.id = current.id;
        updated.username = current.username;
        updated.plan = current.plan;
        updated.pi_uid = current.pi_uid;
        updated.created_at = current.created_at;
        updated.display_name = updated.display_name.trim().to_string();
        updated.bio = non_empty(updated.bio);
        updated.avatar_url = non_empty(updated.avatar_url);
        updated.updated_at = self.timestamp();
        Self::validate_profile(&updated)?;

        self.update_record("profiles", id, &updated, &Self::profile_columns(&updated))?;
        Ok(updated)
    }

    pub fn change_username(&self, id: &str, requested: &str) -> Result<Profile, DroplinkError> {
        let username = validate_username(requested)?;
        let mut profile = self.get_profile(id)?;
        if profile.username == username {
            return Ok(profile);
        }
        if self.username_taken(&username)? {
            return Err(DroplinkError::Conflict(USERNAME_TAKEN.into()));
        }
        info!(profile_id = %id, from = %profile.username, to = %username, "username changed");
        profile.username = username;
        profile.updated_at = self.timestamp();
        self.update_record("profiles", id, &profile, &Self::profile_columns(&profile))?;
        Ok(profile)
    }

    /// Move a profile to another plan. A downgrade resets a custom theme the
    /// new plan does not include; existing links are kept.
    pub fn set_plan(&self, id: &str, plan: PlanTier) -> Result<Profile, DroplinkError> {
        let mut profile = self.get_profile(id)?;
        if profile.plan == plan {
            return Ok(profile);
        }
        info!(profile_id = %id, from = %profile.plan, to = %plan, "plan changed");
        profile.plan = plan;
        if !plan_features(plan).custom_themes {
            profile.theme = DEFAULT_THEME.to_string();
        }
        profile.updated_at = self.timestamp();
        self.update_record("profiles", id, &profile, &Self::profile_columns(&profile))?;
        Ok(profile)
    }

    pub fn complete_onboarding(&self, id: &str) -> Result<Profile, DroplinkError> {
        let mut profile = self.get_profile(id)?;
        if !profile.onboarding_completed {
            profile.onboarding_completed = true;
            profile.updated_at = self.timestamp();
            self.update_record("profiles", id, &profile, &Self::profile_columns(&profile))?;
        }
        Ok(profile)
    }

    /// Delete a profile. Links, analytics, tips and sessions cascade.
    pub fn delete_profile(&self, id: &str) -> Result<(), DroplinkError> {
        self.delete_record("profiles", id)?;
        info!(profile_id = %id, "profile deleted");
        Ok(())
    }

    /// The page a visitor sees.
    pub fn public_page(&self, username: &str) -> Result<PublicPage, DroplinkError> {
        let profile = self.get_profile_by_username(username)?;
        let features = plan_features(profile.plan);
        let links = self
            .list_links(&profile.id)?
            .into_iter()
            .filter(|l| l.active)
            .collect();
        Ok(PublicPage {
            username: profile.username,
            display_name: profile.display_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            theme: profile.theme,
            links,
            show_branding: !features.remove_branding,
            accepts_tips: features.pi_tips,
        })
    }
}
