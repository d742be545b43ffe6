use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::AppState;
use crate::pi::PiClientConfig;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/config/pi", get(pi_config))
}

/// GET /api/config/pi — what the browser passes to `Pi.init`.
async fn pi_config(State(svc): State<AppState>) -> Json<PiClientConfig> {
    Json(svc.config().pi.client_config())
}
