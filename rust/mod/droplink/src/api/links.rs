use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::{Json, Router};

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::{Claims, CreateLink, Link, ReorderLinks, UpdateLink};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me/links", get(list_links).post(add_link))
        .route("/api/me/links/reorder", put(reorder_links))
        .route("/api/me/links/{id}", patch(update_link).delete(delete_link))
}

async fn list_links(
    State(svc): State<AppState>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let links = svc.list_links(&claims.sub).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "items": links })))
}

/// POST /api/me/links — 403 `PLAN_LIMIT` once the plan's quota is used.
async fn add_link(
    State(svc): State<AppState>,
    claims: Claims,
    Json(input): Json<CreateLink>,
) -> Result<(StatusCode, Json<Link>), ServiceError> {
    let link = svc.add_link(&claims.sub, input).map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn update_link(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Json(patch): Json<UpdateLink>,
) -> Result<Json<Link>, ServiceError> {
    let link = svc.update_link(&claims.sub, &id, patch).map_err(ServiceError::from)?;
    Ok(Json(link))
}

async fn delete_link(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_link(&claims.sub, &id).map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_links(
    State(svc): State<AppState>,
    claims: Claims,
    Json(req): Json<ReorderLinks>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let links = svc
        .reorder_links(&claims.sub, &req.link_ids)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "items": links })))
}
