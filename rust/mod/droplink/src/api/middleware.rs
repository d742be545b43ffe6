use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::Claims;

/// Paths that always require a Bearer token.
const PROTECTED_PREFIXES: &[&str] = &["/api/me", "/api/auth/logout"];

/// JWT authentication middleware.
///
/// A valid Bearer token stores [`Claims`] in the request extensions.
/// Protected paths reject a missing or invalid token. Elsewhere an invalid
/// token is dropped and the request continues anonymously, so a client
/// holding a stale token can still sign in again. Handlers that need a
/// caller outside the protected paths take `Claims` as an extractor.
pub async fn auth_middleware(
    State(svc): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = extract_bearer(req.headers()).map(str::to_string);
    let protected = is_protected_path(req.uri().path());

    match token {
        Some(token) => match svc.verify_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                next.run(req).await
            }
            Err(e) if protected => ServiceError::from(e).into_response(),
            Err(e) => {
                debug!(path = %req.uri().path(), error = %e, "ignoring invalid token on public path");
                next.run(req).await
            }
        },
        None if protected => {
            ServiceError::Unauthorized("missing authorization header".into()).into_response()
        }
        None => next.run(req).await,
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_protected_path(path: &str) -> bool {
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{}/", prefix)))
}

impl<S: Send + Sync> FromRequestParts<S> for Claims {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("authentication required".into()))
    }
}

/// Claims when the caller sent a valid token, `None` for anonymous callers.
pub struct MaybeClaims(pub Option<Claims>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeClaims {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeClaims(parts.extensions.get::<Claims>().cloned()))
    }
}
