use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

use droplink_core::{ListParams, ServiceError};

use crate::api::AppState;
use crate::model::{
    Claims, CreateCategory, CreateReply, CreateTopic, ForumCategory, ForumReply, ForumTopic,
    SetLocked, SetPinned,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/forum/categories", get(list_categories).post(create_category))
        .route(
            "/api/forum/categories/{id}/topics",
            get(list_topics).post(create_topic),
        )
        .route("/api/forum/topics/{id}", get(get_topic).delete(delete_topic))
        .route("/api/forum/topics/{id}/pin", put(pin_topic))
        .route("/api/forum/topics/{id}/lock", put(lock_topic))
        .route(
            "/api/forum/topics/{id}/replies",
            get(list_replies).post(create_reply),
        )
}

async fn list_categories(State(svc): State<AppState>) -> Result<Json<serde_json::Value>, ServiceError> {
    let items = svc.list_categories().map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({ "items": items })))
}

async fn create_category(
    State(svc): State<AppState>,
    _claims: Claims,
    Json(input): Json<CreateCategory>,
) -> Result<(StatusCode, Json<ForumCategory>), ServiceError> {
    let category = svc.create_category(input).map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_topics(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = svc.list_topics(&id, &params).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn create_topic(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Json(input): Json<CreateTopic>,
) -> Result<(StatusCode, Json<ForumTopic>), ServiceError> {
    let topic = svc
        .create_topic(&claims.sub, &id, input)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(topic)))
}

/// GET /api/forum/topics/{id} — counts a view.
async fn get_topic(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ForumTopic>, ServiceError> {
    Ok(Json(svc.view_topic(&id).map_err(ServiceError::from)?))
}

async fn delete_topic(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_topic(&claims.sub, &id).map_err(ServiceError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn pin_topic(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Json(req): Json<SetPinned>,
) -> Result<Json<ForumTopic>, ServiceError> {
    let topic = svc
        .set_topic_pinned(&claims.sub, &id, req.pinned)
        .map_err(ServiceError::from)?;
    Ok(Json(topic))
}

async fn lock_topic(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Json(req): Json<SetLocked>,
) -> Result<Json<ForumTopic>, ServiceError> {
    let topic = svc
        .set_topic_locked(&claims.sub, &id, req.locked)
        .map_err(ServiceError::from)?;
    Ok(Json(topic))
}

async fn list_replies(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = svc.list_replies(&id, &params).map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

async fn create_reply(
    State(svc): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Json(input): Json<CreateReply>,
) -> Result<(StatusCode, Json<ForumReply>), ServiceError> {
    let reply = svc
        .create_reply(&claims.sub, &id, input)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(reply)))
}
