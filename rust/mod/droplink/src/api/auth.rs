use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::{AuthResponse, Claims, PiAuthRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/pi", post(sign_in))
        .route("/api/auth/logout", post(logout))
}

/// POST /api/auth/pi — exchange a Pi access token for a session token.
async fn sign_in(
    State(svc): State<AppState>,
    Json(req): Json<PiAuthRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ServiceError> {
    let resp = svc.authenticate_pi(req).await.map_err(ServiceError::from)?;
    let status = if resp.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(resp)))
}

/// POST /api/auth/logout — revoke the current session.
async fn logout(State(svc): State<AppState>, claims: Claims) -> Result<StatusCode, ServiceError> {
    svc.revoke_session(&claims.sid).map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
