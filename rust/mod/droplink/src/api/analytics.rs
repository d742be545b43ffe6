use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use droplink_core::ServiceError;

use crate::api::{user_agent, AppState};
use crate::model::{AnalyticsSummary, Claims};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me/analytics", get(summary))
        .route("/api/track/view", post(track_view))
        .route("/api/track/click", post(track_click))
        .route("/api/track/share", post(track_share))
}

#[derive(Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    days: Option<u32>,
}

/// GET /api/me/analytics?days= — depth depends on the caller's plan.
async fn summary(
    State(svc): State<AppState>,
    claims: Claims,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<AnalyticsSummary>, ServiceError> {
    let profile = svc.get_profile(&claims.sub).map_err(ServiceError::from)?;
    let summary = svc
        .summary(&profile.id, profile.plan, q.days)
        .map_err(ServiceError::from)?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
struct ViewEvent {
    username: String,
    #[serde(default)]
    referrer: Option<String>,
}

#[derive(Deserialize)]
struct ClickEvent {
    #[serde(alias = "link_id", rename = "linkId")]
    link_id: String,
    #[serde(default)]
    referrer: Option<String>,
}

#[derive(Deserialize)]
struct ShareEvent {
    username: String,
}

async fn track_view(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(ev): Json<ViewEvent>,
) -> Result<StatusCode, ServiceError> {
    svc.track_view(&ev.username, ev.referrer, user_agent(&headers))
        .map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn track_click(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(ev): Json<ClickEvent>,
) -> Result<StatusCode, ServiceError> {
    svc.record_click(&ev.link_id, ev.referrer, user_agent(&headers))
        .map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn track_share(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(ev): Json<ShareEvent>,
) -> Result<StatusCode, ServiceError> {
    svc.track_share(&ev.username, user_agent(&headers))
        .map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
