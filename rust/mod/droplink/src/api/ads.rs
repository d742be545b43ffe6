use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};

use droplink_core::{format_timestamp, ServiceError};

use crate::api::{AppState, MaybeClaims, SESSION_HEADER};
use crate::model::Claims;
use crate::plan::PlanTier;
use crate::service::ads::AdAccess;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ads/watched", post(watched))
        .route("/api/ads/access", get(access).delete(clear))
}

/// Session key and plan of the caller. Signed-in callers without the
/// header are keyed by profile id.
fn caller(
    svc: &AppState,
    headers: &HeaderMap,
    claims: Option<&Claims>,
) -> Result<(String, PlanTier), ServiceError> {
    let plan = match claims {
        Some(c) => svc.get_profile(&c.sub).map_err(ServiceError::from)?.plan,
        None => PlanTier::Free,
    };
    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| claims.map(|c| c.sub.clone()))
        .ok_or_else(|| ServiceError::Validation(format!("missing {} header", SESSION_HEADER)))?;
    Ok((session, plan))
}

/// POST /api/ads/watched — open the access window.
async fn watched(
    State(svc): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (session, _) = caller(&svc, &headers, claims.as_ref())?;
    let expiry = svc.mark_ad_watched(&session).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "hasAccess": true,
        "expiresAt": format_timestamp(expiry),
    })))
}

async fn access(
    State(svc): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    headers: HeaderMap,
) -> Result<Json<AdAccess>, ServiceError> {
    let (session, plan) = caller(&svc, &headers, claims.as_ref())?;
    Ok(Json(svc.ad_access(&session, plan).map_err(ServiceError::from)?))
}

async fn clear(
    State(svc): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    headers: HeaderMap,
) -> Result<StatusCode, ServiceError> {
    let (session, _) = caller(&svc, &headers, claims.as_ref())?;
    svc.clear_ad_access(&session).map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
