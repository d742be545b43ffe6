use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::service::username::{UsernameStatus, USERNAME_TAKEN};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/username/check", get(check_get).post(check_post))
}

#[derive(Deserialize)]
struct CheckRequest {
    #[serde(default)]
    username: String,
}

/// `{available, error?}`, the shape the signup form reads.
#[derive(Serialize)]
struct CheckResponse {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn respond(status: UsernameStatus) -> Response {
    match status {
        UsernameStatus::Available(_) => (
            StatusCode::OK,
            Json(CheckResponse {
                available: true,
                error: None,
            }),
        )
            .into_response(),
        UsernameStatus::Taken => (
            StatusCode::OK,
            Json(CheckResponse {
                available: false,
                error: Some(USERNAME_TAKEN.to_string()),
            }),
        )
            .into_response(),
        UsernameStatus::Invalid(e) => (
            StatusCode::BAD_REQUEST,
            Json(CheckResponse {
                available: false,
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

/// POST /api/username/check
async fn check_post(
    State(svc): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Response, ServiceError> {
    let status = svc.check_username(&req.username).map_err(ServiceError::from)?;
    Ok(respond(status))
}

/// GET /api/username/check?username=
async fn check_get(
    State(svc): State<AppState>,
    Query(req): Query<CheckRequest>,
) -> Result<Response, ServiceError> {
    let status = svc.check_username(&req.username).map_err(ServiceError::from)?;
    Ok(respond(status))
}
