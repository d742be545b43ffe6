use serde::{Deserialize, Serialize};

use crate::pi::PiUser;
use crate::model::Profile;

/// A bearer-token session, kept for revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub profile_id: String,
    pub issued_at: String,
    pub expires_at: String,
    #[serde(default)]
    pub revoked: bool,
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: profile id.
    pub sub: String,
    pub username: String,
    /// Session id, for revocation.
    pub sid: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Body of `POST /api/auth/pi`, the result of `Pi.authenticate` in the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiAuthRequest {
    pub access_token: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub profile: Profile,
    pub user: PiUser,
    /// True when this sign-in created the profile.
    pub created: bool,
}
