//! Watch-an-ad access window.
//!
//! Watching an ad unlocks gated content for a fixed window. The grant is
//! keyed by an opaque client session key and trusted as reported; there is
//! no proof the ad was watched.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use droplink_core::format_timestamp;

use crate::plan::PlanTier;
use crate::service::{DroplinkError, DroplinkService};

const KEY_PREFIX: &str = "ads/";
const MAX_SESSION_KEY: usize = 128;

/// Current ad-gate state for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdAccess {
    pub has_access: bool,
    /// The plan skips ads entirely.
    pub ad_free: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

fn ad_key(session: &str) -> Result<String, DroplinkError> {
    let session = session.trim();
    if session.is_empty() || session.len() > MAX_SESSION_KEY {
        return Err(DroplinkError::Validation("invalid session key".into()));
    }
    Ok(format!("{}{}", KEY_PREFIX, session))
}

fn parse_expiry(raw: &[u8]) -> Option<DateTime<Utc>> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

impl DroplinkService {
    fn ad_window(&self) -> Duration {
        Duration::minutes(self.config.ad_window_minutes)
    }

    /// Unexpired grant for `session`. Expired grants are removed.
    fn ad_expiry(&self, session: &str) -> Result<Option<DateTime<Utc>>, DroplinkError> {
        let key = ad_key(session)?;
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(None);
        };
        match parse_expiry(&raw) {
            Some(t) if self.now() < t => Ok(Some(t)),
            _ => {
                self.kv.delete(&key)?;
                Ok(None)
            }
        }
    }

    /// Record that `session` watched an ad. Returns when the grant expires.
    pub fn mark_ad_watched(&self, session: &str) -> Result<DateTime<Utc>, DroplinkError> {
        let key = ad_key(session)?;
        let expiry = self.now() + self.ad_window();
        self.kv.set(&key, format_timestamp(expiry).as_bytes())?;
        debug!(session = %session, expires_at = %expiry, "ad watched");
        Ok(expiry)
    }

    /// Whether `session` may see ad-gated content on `plan`.
    pub fn can_access_content(&self, session: &str, plan: PlanTier) -> Result<bool, DroplinkError> {
        if plan.bypasses_ads() {
            return Ok(true);
        }
        Ok(self.ad_expiry(session)?.is_some())
    }

    pub fn clear_ad_access(&self, session: &str) -> Result<(), DroplinkError> {
        self.kv.delete(&ad_key(session)?)?;
        Ok(())
    }

    /// Remove every expired or unreadable grant. Returns how many were removed.
    pub fn purge_expired_ad_access(&self) -> Result<usize, DroplinkError> {
        let now = self.now();
        let mut removed = 0;
        for (key, raw) in self.kv.scan(KEY_PREFIX)? {
            match parse_expiry(&raw) {
                Some(t) if now < t => {}
                _ => {
                    self.kv.delete(&key)?;
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            info!(removed, "purged expired ad grants");
        }
        Ok(removed)
    }

    pub fn ad_access(&self, session: &str, plan: PlanTier) -> Result<AdAccess, DroplinkError> {
        if plan.bypasses_ads() {
            return Ok(AdAccess {
                has_access: true,
                ad_free: true,
                expires_at: None,
            });
        }
        let expiry = self.ad_expiry(session)?;
        Ok(AdAccess {
            has_access: expiry.is_some(),
            ad_free: false,
            expires_at: expiry.map(format_timestamp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    #[test]
    fn watching_grants_a_thirty_minute_window() {
        let (svc, clock) = testing::service();
        assert!(!svc.can_access_content("s1", PlanTier::Free).unwrap());

        let expiry = svc.mark_ad_watched("s1").unwrap();
        assert_eq!(expiry, svc.now() + Duration::minutes(30));
        assert!(svc.can_access_content("s1", PlanTier::Free).unwrap());
        assert!(!svc.can_access_content("s2", PlanTier::Free).unwrap());

        clock.advance(Duration::minutes(29));
        assert!(svc.can_access_content("s1", PlanTier::Pro).unwrap());

        clock.advance(Duration::minutes(2));
        assert!(!svc.can_access_content("s1", PlanTier::Free).unwrap());
        assert!(svc.kv.get("ads/s1").unwrap().is_none());
    }

    #[test]
    fn premium_never_needs_ads() {
        let (svc, clock) = testing::service();
        assert!(svc.can_access_content("s1", PlanTier::Premium).unwrap());
        svc.mark_ad_watched("s1").unwrap();
        clock.advance(Duration::minutes(31));
        assert!(svc.can_access_content("s1", PlanTier::Premium).unwrap());
        assert!(!svc.can_access_content("s1", PlanTier::Starter).unwrap());

        let access = svc.ad_access("s1", PlanTier::Premium).unwrap();
        assert!(access.has_access && access.ad_free);
    }

    #[test]
    fn clearing_revokes_access() {
        let (svc, _) = testing::service();
        svc.mark_ad_watched("s1").unwrap();
        let access = svc.ad_access("s1", PlanTier::Free).unwrap();
        assert!(access.has_access);
        assert!(access.expires_at.is_some());

        svc.clear_ad_access("s1").unwrap();
        assert!(!svc.can_access_content("s1", PlanTier::Free).unwrap());
    }

    #[test]
    fn corrupt_grant_is_dropped() {
        let (svc, _) = testing::service();
        svc.kv.set("ads/s1", b"not a time").unwrap();
        assert!(!svc.can_access_content("s1", PlanTier::Free).unwrap());
        assert!(svc.kv.get("ads/s1").unwrap().is_none());
    }

    #[test]
    fn session_key_is_required() {
        let (svc, _) = testing::service();
        assert!(matches!(svc.mark_ad_watched("  "), Err(DroplinkError::Validation(_))));
    }

    #[test]
    fn purge_removes_only_expired_grants() {
        let (svc, clock) = testing::service();
        svc.mark_ad_watched("old").unwrap();
        clock.advance(Duration::minutes(20));
        svc.mark_ad_watched("new").unwrap();
        svc.kv.set("ads/broken", b"not a timestamp").unwrap();
        clock.advance(Duration::minutes(15));

        assert_eq!(svc.purge_expired_ad_access().unwrap(), 2);
        assert!(svc.kv.get("ads/old").unwrap().is_none());
        assert!(svc.kv.get("ads/broken").unwrap().is_none());
        assert!(svc.can_access_content("new", PlanTier::Free).unwrap());
        assert_eq!(svc.purge_expired_ad_access().unwrap(), 0);
    }
}
