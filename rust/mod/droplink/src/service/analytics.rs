use std::collections::HashMap;

use chrono::{Duration, NaiveTime};
use tracing::debug;

use droplink_core::{format_timestamp, new_id};
use droplink_sql::Value;

use crate::model::{
    AnalyticsEvent, AnalyticsSummary, DailyCount, EventKind, EventTotals, LinkClicks, ReferrerCount,
};
use crate::plan::{plan_features, AnalyticsTier, PlanTier};
use crate::service::{non_empty, DroplinkError, DroplinkService};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 365;
const TOP_REFERRERS: usize = 5;
const MAX_REFERRER: usize = 512;
const MAX_USER_AGENT: usize = 512;

fn clip(s: Option<String>, max: usize) -> Option<String> {
    non_empty(s).map(|v| v.chars().take(max).collect())
}

impl DroplinkService {
    /// Append an analytics event for a profile.
    pub fn record_event(
        &self,
        profile_id: &str,
        kind: EventKind,
        link_id: Option<String>,
        referrer: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AnalyticsEvent, DroplinkError> {
        let event = AnalyticsEvent {
            id: new_id(),
            profile_id: profile_id.to_string(),
            kind,
            link_id,
            referrer: clip(referrer, MAX_REFERRER),
            user_agent: clip(user_agent, MAX_USER_AGENT),
            created_at: self.timestamp(),
        };
        self.insert_record(
            "analytics_events",
            &event.id,
            &event,
            &[
                ("profile_id", Value::Text(event.profile_id.clone())),
                ("kind", Value::Text(kind.as_str().to_string())),
                ("link_id", event.link_id.clone().into()),
                ("referrer", event.referrer.clone().into()),
                ("created_at", Value::Text(event.created_at.clone())),
            ],
        )?;
        debug!(profile_id = %profile_id, kind = %kind, "analytics event");
        Ok(event)
    }

    /// A visitor opened the public page of `username`.
    pub fn track_view(
        &self,
        username: &str,
        referrer: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(), DroplinkError> {
        let profile = self.get_profile_by_username(username)?;
        self.record_event(&profile.id, EventKind::View, None, referrer, user_agent)?;
        Ok(())
    }

    /// A visitor shared the public page of `username`.
    pub fn track_share(&self, username: &str, user_agent: Option<String>) -> Result<(), DroplinkError> {
        let profile = self.get_profile_by_username(username)?;
        self.record_event(&profile.id, EventKind::Share, None, None, user_agent)?;
        Ok(())
    }

    /// Dashboard numbers for the last `days` days (today included).
    ///
    /// Totals are always present. The daily series and top referrers need
    /// the advanced tier, per-link clicks need the full tier.
    pub fn summary(
        &self,
        profile_id: &str,
        plan: PlanTier,
        days: Option<u32>,
    ) -> Result<AnalyticsSummary, DroplinkError> {
        let days = days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, MAX_WINDOW_DAYS);
        let tier = plan_features(plan).analytics;

        let today = self.now().date_naive();
        let first_day = today - Duration::days(days as i64 - 1);
        let since = format_timestamp(first_day.and_time(NaiveTime::MIN).and_utc());
        let params = [
            Value::Text(profile_id.to_string()),
            Value::Text(since),
        ];

        let mut totals = EventTotals::default();
        for row in self.sql.query(
            "SELECT kind, COUNT(*) AS cnt FROM analytics_events \
             WHERE profile_id = ?1 AND created_at >= ?2 GROUP BY kind",
            &params,
        )? {
            if let Some(kind) = row.get_str("kind").and_then(EventKind::from_column) {
                totals.add(kind, row.get_i64("cnt").unwrap_or(0).max(0) as u64);
            }
        }

        let mut summary = AnalyticsSummary {
            tier,
            totals,
            daily: None,
            top_referrers: None,
            link_clicks: None,
        };
        if tier < AnalyticsTier::Advanced {
            return Ok(summary);
        }

        let mut by_day: HashMap<String, EventTotals> = HashMap::new();
        for row in self.sql.query(
            "SELECT substr(created_at, 1, 10) AS day, kind, COUNT(*) AS cnt FROM analytics_events \
             WHERE profile_id = ?1 AND created_at >= ?2 GROUP BY day, kind",
            &params,
        )? {
            let (Some(day), Some(kind)) = (
                row.get_str("day"),
                row.get_str("kind").and_then(EventKind::from_column),
            ) else {
                continue;
            };
            by_day
                .entry(day.to_string())
                .or_default()
                .add(kind, row.get_i64("cnt").unwrap_or(0).max(0) as u64);
        }
        summary.daily = Some(
            first_day
                .iter_days()
                .take(days as usize)
                .map(|d| {
                    let date = d.format("%Y-%m-%d").to_string();
                    let totals = by_day.remove(&date).unwrap_or_default();
                    DailyCount { date, totals }
                })
                .collect(),
        );

        let referrers = self.sql.query(
            "SELECT referrer, COUNT(*) AS cnt FROM analytics_events \
             WHERE profile_id = ?1 AND created_at >= ?2 AND referrer IS NOT NULL \
             GROUP BY referrer ORDER BY cnt DESC, referrer LIMIT ?3",
            &[
                params[0].clone(),
                params[1].clone(),
                Value::Integer(TOP_REFERRERS as i64),
            ],
        )?;
        summary.top_referrers = Some(
            referrers
                .iter()
                .filter_map(|row| {
                    Some(ReferrerCount {
                        referrer: row.get_str("referrer")?.to_string(),
                        count: row.get_i64("cnt").unwrap_or(0).max(0) as u64,
                    })
                })
                .collect(),
        );

        if tier < AnalyticsTier::Full {
            return Ok(summary);
        }

        let mut clicks: HashMap<String, u64> = HashMap::new();
        for row in self.sql.query(
            "SELECT link_id, COUNT(*) AS cnt FROM analytics_events \
             WHERE profile_id = ?1 AND created_at >= ?2 AND kind = 'click' AND link_id IS NOT NULL \
             GROUP BY link_id",
            &params,
        )? {
            if let Some(id) = row.get_str("link_id") {
                clicks.insert(id.to_string(), row.get_i64("cnt").unwrap_or(0).max(0) as u64);
            }
        }
        summary.link_clicks = Some(
            self.list_links(profile_id)?
                .into_iter()
                .map(|l| LinkClicks {
                    clicks: clicks.get(&l.id).copied().unwrap_or(0),
                    link_id: l.id,
                    title: l.title,
                })
                .collect(),
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::model::{CreateLink, CreateProfile, Profile};
    use crate::service::testing;

    fn setup() -> (std::sync::Arc<DroplinkService>, std::sync::Arc<droplink_core::ManualClock>, Profile) {
        let (svc, clock) = testing::service();
        clock.set(Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap());
        let p = svc
            .create_profile(CreateProfile {
                username: "alice".into(),
                ..Default::default()
            })
            .unwrap();
        (svc, clock, p)
    }

    #[test]
    fn basic_tier_has_only_totals() {
        let (svc, _, p) = setup();
        svc.track_view("alice", Some("https://t.co".into()), None).unwrap();
        svc.track_view("Alice", None, None).unwrap();
        svc.track_share("alice", None).unwrap();

        let s = svc.summary(&p.id, PlanTier::Free, None).unwrap();
        assert_eq!(s.tier, AnalyticsTier::Basic);
        assert_eq!(s.totals, EventTotals { views: 2, clicks: 0, shares: 1 });
        assert!(s.daily.is_none());
        assert!(s.top_referrers.is_none());
        assert!(s.link_clicks.is_none());

        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("daily").is_none());
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let (svc, _, _) = setup();
        assert!(matches!(svc.track_view("nobody", None, None), Err(DroplinkError::NotFound(_))));
    }

    #[test]
    fn advanced_tier_has_daily_series_and_referrers() {
        let (svc, clock, p) = setup();
        for r in ["https://t.co", "https://t.co", "https://x.com", "a", "b", "c", "d"] {
            svc.track_view("alice", Some(r.into()), None).unwrap();
        }
        clock.advance(Duration::days(1));
        svc.track_view("alice", None, None).unwrap();

        let s = svc.summary(&p.id, PlanTier::Pro, Some(7)).unwrap();
        assert_eq!(s.tier, AnalyticsTier::Advanced);
        let daily = s.daily.unwrap();
        assert_eq!(daily.len(), 7);
        assert_eq!(daily[5].date, "2026-03-10");
        assert_eq!(daily[5].totals.views, 7);
        assert_eq!(daily[6].date, "2026-03-11");
        assert_eq!(daily[6].totals.views, 1);
        assert_eq!(daily[0].totals, EventTotals::default());

        let refs = s.top_referrers.unwrap();
        assert_eq!(refs.len(), 5);
        assert_eq!(refs[0], ReferrerCount { referrer: "https://t.co".into(), count: 2 });
        assert!(s.link_clicks.is_none());
    }

    #[test]
    fn window_excludes_old_events() {
        let (svc, clock, p) = setup();
        svc.track_view("alice", None, None).unwrap();
        clock.advance(Duration::days(40));
        svc.track_view("alice", None, None).unwrap();

        let s = svc.summary(&p.id, PlanTier::Free, None).unwrap();
        assert_eq!(s.totals.views, 1);
        let s = svc.summary(&p.id, PlanTier::Free, Some(1000)).unwrap();
        assert_eq!(s.totals.views, 2);
    }

    #[test]
    fn full_tier_has_link_clicks() {
        let (svc, _, p) = setup();
        svc.set_plan(&p.id, PlanTier::Premium).unwrap();
        let a = svc
            .add_link(&p.id, CreateLink { title: "A".into(), url: "https://a.example".into(), icon: None, active: None })
            .unwrap();
        let b = svc
            .add_link(&p.id, CreateLink { title: "B".into(), url: "https://b.example".into(), icon: None, active: None })
            .unwrap();
        svc.record_click(&a.id, None, None).unwrap();
        svc.record_click(&a.id, None, None).unwrap();

        let s = svc.summary(&p.id, PlanTier::Premium, None).unwrap();
        assert_eq!(s.totals.clicks, 2);
        let clicks = s.link_clicks.unwrap();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].link_id, a.id);
        assert_eq!(clicks[0].clicks, 2);
        assert_eq!(clicks[1].link_id, b.id);
        assert_eq!(clicks[1].clicks, 0);
    }
}
