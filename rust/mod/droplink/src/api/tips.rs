use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::{Claims, CreateTip, Tip};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/profiles/{username}/tips", post(create_tip))
        .route("/api/me/tips", get(my_tips))
}

/// POST /api/profiles/{username}/tips — open a pending tip before the
/// browser starts the Pi payment.
async fn create_tip(
    State(svc): State<AppState>,
    Path(username): Path<String>,
    Json(input): Json<CreateTip>,
) -> Result<(StatusCode, Json<Tip>), ServiceError> {
    let tip = svc.create_tip(&username, input).map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(tip)))
}

/// GET /api/me/tips — received tips and the completed total.
async fn my_tips(
    State(svc): State<AppState>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let items = svc.list_tips(&claims.sub).map_err(ServiceError::from)?;
    let total = svc.tip_total(&claims.sub).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "items": items,
        "total": total,
    })))
}
