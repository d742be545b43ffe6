use std::fmt;

use serde::{Deserialize, Serialize};

/// What a visitor did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Click,
    Share,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Click => "click",
            EventKind::Share => "share",
        }
    }

    pub fn from_column(s: &str) -> Option<EventKind> {
        match s {
            "view" => Some(EventKind::View),
            "click" => Some(EventKind::Click),
            "share" => Some(EventKind::Share),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: String,
    pub profile_id: String,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventTotals {
    pub views: u64,
    pub clicks: u64,
    pub shares: u64,
}

impl EventTotals {
    pub fn add(&mut self, kind: EventKind, n: u64) {
        match kind {
            EventKind::View => self.views += n,
            EventKind::Click => self.clicks += n,
            EventKind::Share => self.shares += n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    #[serde(flatten)]
    pub totals: EventTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkClicks {
    pub link_id: String,
    pub title: String,
    pub clicks: u64,
}

/// Analytics dashboard payload. Sections beyond `totals` are present only
/// when the plan's analytics tier includes them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub tier: crate::plan::AnalyticsTier,
    pub totals: EventTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailyCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_referrers: Option<Vec<ReferrerCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_clicks: Option<Vec<LinkClicks>>,
}
