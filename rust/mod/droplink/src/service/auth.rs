use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{info, warn};

use droplink_core::{format_timestamp, new_id};
use droplink_sql::Value;

use crate::model::{AuthResponse, Claims, CreateProfile, PiAuthRequest, Profile, Session};
use crate::pi::{PiScope, PiUser};
use crate::service::{DroplinkError, DroplinkService};

impl DroplinkService {
    /// Sign in with a Pi access token, creating the profile on first use.
    pub async fn authenticate_pi(&self, req: PiAuthRequest) -> Result<AuthResponse, DroplinkError> {
        for scope in &req.scopes {
            if PiScope::parse(scope).is_none() {
                return Err(DroplinkError::Validation(format!("unknown scope '{}'", scope)));
            }
        }
        let token = req.access_token.trim();
        if token.is_empty() {
            return Err(DroplinkError::Validation("accessToken is required".into()));
        }

        let user = self.pi.me(token).await.map_err(|e| {
            warn!(error = %e, "Pi token verification failed");
            DroplinkError::from(e)
        })?;

        let (profile, created) = self.profile_for_pi_user(&user)?;
        let (token, _) = self.issue_token(&profile)?;
        info!(profile_id = %profile.id, pi_uid = %user.uid, created, "Pi sign-in");

        Ok(AuthResponse {
            token,
            token_type: "Bearer",
            expires_in: self.config.session_ttl,
            profile,
            user,
            created,
        })
    }

    /// The profile linked to a Pi user, created if missing.
    fn profile_for_pi_user(&self, user: &PiUser) -> Result<(Profile, bool), DroplinkError> {
        if let Some(mut profile) = self.find_profile_by_pi_uid(&user.uid)? {
            let wallet = user.wallet_address.clone().or(profile.wallet_address.clone());
            if profile.pi_username.as_deref() != Some(user.username.as_str()) || profile.wallet_address != wallet {
                profile = self.update_profile(
                    &profile.id,
                    serde_json::json!({
                        "piUsername": user.username,
                        "walletAddress": wallet,
                    }),
                )?;
            }
            return Ok((profile, false));
        }

        let username = self.unique_username_from(&user.username)?;
        let created = self.create_profile(CreateProfile {
            username,
            display_name: Some(user.username.clone()),
            pi_uid: Some(user.uid.clone()),
            pi_username: Some(user.username.clone()),
            wallet_address: user.wallet_address.clone(),
            ..Default::default()
        });
        match created {
            Ok(p) => Ok((p, true)),
            // Lost a race with a concurrent sign-in of the same user.
            Err(DroplinkError::Conflict(_)) => match self.find_profile_by_pi_uid(&user.uid)? {
                Some(p) => Ok((p, false)),
                None => Err(DroplinkError::Conflict("could not allocate a username".into())),
            },
            Err(e) => Err(e),
        }
    }

    /// Create a session for `profile` and sign its access token.
    pub fn issue_token(&self, profile: &Profile) -> Result<(String, Session), DroplinkError> {
        let now = self.now();
        let exp = now + Duration::seconds(self.config.session_ttl);

        let session = Session {
            id: new_id(),
            profile_id: profile.id.clone(),
            issued_at: format_timestamp(now),
            expires_at: format_timestamp(exp),
            revoked: false,
        };
        let claims = Claims {
            sub: profile.id.clone(),
            username: profile.username.clone(),
            sid: session.id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| DroplinkError::Internal(format!("JWT encode failed: {}", e)))?;

        self.insert_record(
            "sessions",
            &session.id,
            &session,
            &[
                ("profile_id", Value::Text(session.profile_id.clone())),
                ("revoked", Value::Integer(0)),
                ("issued_at", Value::Text(session.issued_at.clone())),
                ("expires_at", Value::Text(session.expires_at.clone())),
            ],
        )?;
        Ok((token, session))
    }

    /// Verify a bearer token: signature, expiry, and a live session.
    pub fn verify_token(&self, token: &str) -> Result<Claims, DroplinkError> {
        // Expiry is checked against the service clock below.
        let mut validation = Validation::default();
        validation.validate_exp = false;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| DroplinkError::Unauthorized(format!("invalid token: {}", e)))?
        .claims;

        if claims.exp <= self.now().timestamp() {
            return Err(DroplinkError::Unauthorized("token has expired".into()));
        }
        let session: Session = self
            .get_record("sessions", &claims.sid)
            .map_err(|_| DroplinkError::Unauthorized("session not found".into()))?;
        if session.revoked {
            return Err(DroplinkError::Unauthorized("session has been revoked".into()));
        }
        Ok(claims)
    }

    pub fn revoke_session(&self, session_id: &str) -> Result<(), DroplinkError> {
        let mut session: Session = self.get_record("sessions", session_id)?;
        session.revoked = true;
        self.update_record("sessions", session_id, &session, &[("revoked", Value::Integer(1))])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    fn sign_in(token: &str) -> PiAuthRequest {
        PiAuthRequest {
            access_token: token.into(),
            scopes: vec!["username".into(), "payments".into()],
        }
    }

    #[tokio::test]
    async fn first_sign_in_creates_a_profile() {
        let (svc, _) = testing::service();
        let resp = svc.authenticate_pi(sign_in("token-alice")).await.unwrap();
        assert!(resp.created);
        assert_eq!(resp.token_type, "Bearer");
        assert_eq!(resp.user.uid, "mock-tokenali");
        assert_eq!(resp.profile.username, "mock_tokenali");
        assert_eq!(resp.profile.pi_uid.as_deref(), Some("mock-tokenali"));

        let claims = svc.verify_token(&resp.token).unwrap();
        assert_eq!(claims.sub, resp.profile.id);

        let again = svc.authenticate_pi(sign_in("token-alice")).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.profile.id, resp.profile.id);
    }

    #[tokio::test]
    async fn derived_username_avoids_collisions() {
        let (svc, _) = testing::service();
        svc.create_profile(CreateProfile {
            username: "mock_tokenbob".into(),
            ..Default::default()
        })
        .unwrap();
        let resp = svc.authenticate_pi(sign_in("tokenbob")).await.unwrap();
        assert_eq!(resp.profile.username, "mock_tokenbob2");
    }

    #[tokio::test]
    async fn rejects_unknown_scopes_and_empty_tokens() {
        let (svc, _) = testing::service();
        let req = PiAuthRequest {
            access_token: "t".into(),
            scopes: vec!["email".into()],
        };
        assert!(matches!(svc.authenticate_pi(req).await, Err(DroplinkError::Validation(_))));
        assert!(matches!(svc.authenticate_pi(sign_in("  ")).await, Err(DroplinkError::Validation(_))));
        assert!(matches!(svc.authenticate_pi(sign_in("--")).await, Err(DroplinkError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn tokens_expire_on_the_service_clock() {
        let (svc, clock) = testing::service();
        let resp = svc.authenticate_pi(sign_in("carol")).await.unwrap();
        clock.advance(Duration::seconds(svc.config().session_ttl - 10));
        assert!(svc.verify_token(&resp.token).is_ok());
        clock.advance(Duration::seconds(20));
        assert!(matches!(svc.verify_token(&resp.token), Err(DroplinkError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn revoked_and_foreign_tokens_fail() {
        let (svc, _) = testing::service();
        let resp = svc.authenticate_pi(sign_in("dave")).await.unwrap();
        let claims = svc.verify_token(&resp.token).unwrap();
        svc.revoke_session(&claims.sid).unwrap();
        assert!(svc.verify_token(&resp.token).is_err());
        assert!(svc.verify_token("this.is.not.a.valid.jwt").is_err());
    }

    #[tokio::test]
    async fn deleting_the_profile_invalidates_tokens() {
        let (svc, _) = testing::service();
        let resp = svc.authenticate_pi(sign_in("erin")).await.unwrap();
        svc.delete_profile(&resp.profile.id).unwrap();
        assert!(svc.verify_token(&resp.token).is_err());
    }
}
