use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::{ChangePlan, ChangeUsername, Claims, Profile, PublicPage};
use crate::plan::PlanTier;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me).patch(update_me).delete(delete_me))
        .route("/api/me/username", put(change_username))
        .route("/api/me/plan", put(change_plan))
        .route("/api/me/onboarding", post(complete_onboarding))
        .route("/api/u/{username}", get(public_page))
}

/// GET /api/me
async fn me(State(svc): State<AppState>, claims: Claims) -> Result<Json<Profile>, ServiceError> {
    Ok(Json(svc.get_profile(&claims.sub).map_err(ServiceError::from)?))
}

/// PATCH /api/me — merge-patch of editable fields.
async fn update_me(
    State(svc): State<AppState>,
    claims: Claims,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Profile>, ServiceError> {
    let profile = svc.update_profile(&claims.sub, patch).map_err(ServiceError::from)?;
    Ok(Json(profile))
}

async fn delete_me(State(svc): State<AppState>, claims: Claims) -> Result<StatusCode, ServiceError> {
    svc.delete_profile(&claims.sub).map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_username(
    State(svc): State<AppState>,
    claims: Claims,
    Json(req): Json<ChangeUsername>,
) -> Result<Json<Profile>, ServiceError> {
    let profile = svc
        .change_username(&claims.sub, &req.username)
        .map_err(ServiceError::from)?;
    Ok(Json(profile))
}

/// PUT /api/me/plan — record the tier after a subscription payment.
async fn change_plan(
    State(svc): State<AppState>,
    claims: Claims,
    Json(req): Json<ChangePlan>,
) -> Result<Json<Profile>, ServiceError> {
    let plan = req
        .plan
        .parse::<PlanTier>()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;
    let profile = svc.set_plan(&claims.sub, plan).map_err(ServiceError::from)?;
    Ok(Json(profile))
}

async fn complete_onboarding(
    State(svc): State<AppState>,
    claims: Claims,
) -> Result<Json<Profile>, ServiceError> {
    let profile = svc.complete_onboarding(&claims.sub).map_err(ServiceError::from)?;
    Ok(Json(profile))
}

/// GET /api/u/{username} — the public link-in-bio page.
async fn public_page(
    State(svc): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicPage>, ServiceError> {
    Ok(Json(svc.public_page(&username).map_err(ServiceError::from)?))
}
