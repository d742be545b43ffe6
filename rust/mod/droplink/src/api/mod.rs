mod ads;
mod analytics;
mod auth;
mod config;
mod forum;
mod links;
mod middleware;
mod payments;
mod plans;
mod profile;
mod tips;
mod username;

use std::sync::Arc;

use axum::Router;

use crate::service::DroplinkService;

pub use middleware::MaybeClaims;

/// Shared application state.
pub type AppState = Arc<DroplinkService>;

/// Header carrying the browser's opaque session key for the ad gate.
pub const SESSION_HEADER: &str = "x-droplink-session";

/// Build the complete Droplink API router. Paths are absolute (`/api/...`).
pub fn build_router(svc: Arc<DroplinkService>) -> Router {
    Router::new()
        .merge(config::routes())
        .merge(plans::routes())
        .merge(username::routes())
        .merge(auth::routes())
        .merge(profile::routes())
        .merge(links::routes())
        .merge(analytics::routes())
        .merge(tips::routes())
        .merge(payments::routes())
        .merge(ads::routes())
        .merge(forum::routes())
        .layer(axum::middleware::from_fn_with_state(
            svc.clone(),
            middleware::auth_middleware,
        ))
        .with_state(svc)
}

/// `User-Agent` of the request, if readable.
fn user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests;
