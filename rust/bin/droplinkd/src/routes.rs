//! Route registration: module routes plus system endpoints.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;

/// Build the complete router.
pub fn build_router(module_routes: Vec<(&str, Router)>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    // Module routes carry their own /api/... prefix and state.
    for (name, router) in module_routes {
        info!("Mounted {} routes", name);
        app = app.merge(router);
    }
    app
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "droplinkd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use droplink::service::DroplinkConfig;
    use droplink::DroplinkModule;
    use droplink_core::{Module, SystemClock};
    use tower::ServiceExt;

    use super::*;

    fn app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sql = Arc::new(droplink_sql::SqliteStore::open(&dir.path().join("data.sqlite")).unwrap());
        let kv = Arc::new(droplink_kv::RedbStore::open(&dir.path().join("data.redb")).unwrap());
        let mut config = DroplinkConfig::default();
        config.pi.mock_auth = true;
        let module = DroplinkModule::new(sql, kv, Arc::new(SystemClock), config).unwrap();
        (build_router(vec![(module.name(), module.routes())]), dir)
    }

    #[tokio::test]
    async fn health_and_module_routes() {
        let (app, _dir) = app();
        let resp = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/api/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), 4);
    }
}
