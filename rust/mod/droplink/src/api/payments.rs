//! Server side of the Pi payment flow. The browser SDK calls these from its
//! `onReadyForServerApproval` and `onReadyForServerCompletion` callbacks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::{ApprovePaymentRequest, CompletePaymentRequest};
use crate::pi::PiPayment;
use crate::service::DroplinkError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/approve", post(approve))
        .route("/api/payments/complete", post(complete))
        .route("/api/payments/cancel", post(cancel))
}

/// Payment endpoints answer `{success, payment}` or `{error}`.
fn respond(result: Result<PiPayment, DroplinkError>) -> Response {
    match result {
        Ok(payment) => Json(json!({ "success": true, "payment": payment })).into_response(),
        Err(e) => {
            let err = ServiceError::from(e);
            let status: StatusCode = err.status_code();
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

async fn approve(State(svc): State<AppState>, Json(req): Json<ApprovePaymentRequest>) -> Response {
    respond(svc.approve_payment(&req.payment_id).await)
}

async fn complete(State(svc): State<AppState>, Json(req): Json<CompletePaymentRequest>) -> Response {
    respond(svc.complete_payment(&req.payment_id, &req.txid).await)
}

async fn cancel(State(svc): State<AppState>, Json(req): Json<ApprovePaymentRequest>) -> Response {
    respond(svc.cancel_payment(&req.payment_id).await)
}
