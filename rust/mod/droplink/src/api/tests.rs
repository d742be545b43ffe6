use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::build_router;
use crate::service::testing;

fn app() -> Router {
    let (svc, _) = testing::service();
    build_router(svc)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {}", t));
    }
    match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn sign_in(app: &Router, pi_token: &str) -> (String, Value) {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/auth/pi",
            None,
            Some(json!({"accessToken": pi_token, "scopes": ["username", "payments"]})),
        ),
    )
    .await;
    assert!(status == StatusCode::CREATED || status == StatusCode::OK, "{}", body);
    (body["token"].as_str().unwrap().to_string(), body["profile"].clone())
}

#[tokio::test]
async fn username_check_short_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        request("POST", "/api/username/check", None, Some(json!({"username": "ab"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"available": false, "error": "Username must be at least 3 characters long"})
    );
}

#[tokio::test]
async fn username_check_reserved_and_taken() {
    let app = app();
    let (status, body) = send(
        &app,
        request("POST", "/api/username/check", None, Some(json!({"username": "admin"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"available": false, "error": "This username is reserved and cannot be used"})
    );

    let (_, profile) = sign_in(&app, "alice").await;
    let taken = profile["username"].as_str().unwrap().to_uppercase();
    let (status, body) = send(
        &app,
        request("GET", &format!("/api/username/check?username={}", taken), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"available": false, "error": "This username is already taken"}));

    let (status, body) = send(
        &app,
        request("POST", "/api/username/check", None, Some(json!({"username": "Fresh_Name"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"available": true}));
}

#[tokio::test]
async fn me_requires_a_token() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/api/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = send(&app, request("GET", "/api/me", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, profile) = sign_in(&app, "alice").await;
    let (status, body) = send(&app, request("GET", "/api/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], profile["id"]);
    assert_eq!(body["plan"], "free");
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = app();
    let (token, _) = sign_in(&app, "alice").await;
    let (status, _) = send(&app, request("POST", "/api/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request("GET", "/api/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stale_token_is_anonymous_on_public_routes() {
    let app = app();
    let (token, profile) = sign_in(&app, "alice").await;
    send(&app, request("POST", "/api/auth/logout", Some(&token), None)).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/pi",
            Some(&token),
            Some(json!({"accessToken": "alice", "scopes": ["username"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["profile"]["id"], profile["id"]);
    let fresh = body["token"].as_str().unwrap().to_string();
    let (status, _) = send(&app, request("GET", "/api/me", Some(&fresh), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request("POST", "/api/username/check", Some(&token), Some(json!({"username": "ab"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"available": false, "error": "Username must be at least 3 characters long"})
    );

    let (status, _) = send(&app, request("GET", "/api/plans", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::OK);

    // Still rejected where a caller is required.
    let (status, _) = send(&app, request("GET", "/api/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, request("POST", "/api/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_payment_id_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/payments/approve",
            None,
            Some(json!({"paymentId": "victim/../../other/endpoint?x="})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("paymentId"), "{}", body);
}

#[tokio::test]
async fn second_link_on_free_plan_is_plan_limit() {
    let app = app();
    let (token, _) = sign_in(&app, "alice").await;
    let link = json!({"title": "Blog", "url": "https://alice.example"});

    let (status, _) = send(&app, request("POST", "/api/me/links", Some(&token), Some(link.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, request("POST", "/api/me/links", Some(&token), Some(link.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PLAN_LIMIT");

    let (status, _) = send(
        &app,
        request("PUT", "/api/me/plan", Some(&token), Some(json!({"plan": "basic"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request("POST", "/api/me/links", Some(&token), Some(link))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, request("GET", "/api/me/links", Some(&token), None)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn public_page_and_tracking() {
    let app = app();
    let (token, profile) = sign_in(&app, "alice").await;
    let username = profile["username"].as_str().unwrap().to_string();
    let (_, link) = send(
        &app,
        request(
            "POST",
            "/api/me/links",
            Some(&token),
            Some(json!({"title": "Blog", "url": "https://alice.example"})),
        ),
    )
    .await;

    let (status, page) = send(&app, request("GET", &format!("/api/u/{}", username), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["showBranding"], true);
    assert_eq!(page["links"][0]["title"], "Blog");

    let (status, _) = send(
        &app,
        request("POST", "/api/track/view", None, Some(json!({"username": username, "referrer": "https://t.co"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        request("POST", "/api/track/click", None, Some(json!({"linkId": link["id"]}))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        request("POST", "/api/track/view", None, Some(json!({"username": "nobody_here"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, summary) = send(&app, request("GET", "/api/me/analytics", Some(&token), None)).await;
    assert_eq!(summary["tier"], "basic");
    assert_eq!(summary["totals"]["views"], 1);
    assert_eq!(summary["totals"]["clicks"], 1);
    assert!(summary.get("daily").is_none());
}

#[tokio::test]
async fn feature_checks() {
    let app = app();
    let (token, _) = sign_in(&app, "alice").await;
    let (status, body) = send(
        &app,
        request("GET", "/api/me/features/custom_themes", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"hasAccess": false, "requiredPlan": "starter"}));

    let (_, body) = send(&app, request("GET", "/api/me/features/made_up", Some(&token), None)).await;
    assert_eq!(body, json!({"hasAccess": false, "requiredPlan": "premium"}));

    let (_, body) = send(&app, request("GET", "/api/me/features/pi_tips", Some(&token), None)).await;
    assert_eq!(body, json!({"hasAccess": true}));

    let (status, body) = send(&app, request("GET", "/api/plans/elite", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "premium");
    assert_eq!(body["features"]["adFree"], true);

    let (status, _) = send(&app, request("GET", "/api/plans/gold", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pi_config_exposes_sandbox_flag() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/api/config/pi", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sandbox"], false);
    assert_eq!(body["version"], "2.0");
}

#[tokio::test]
async fn ad_gate_by_session_header() {
    let app = app();
    let with_session = |method: &str| {
        Request::builder()
            .method(method)
            .uri(if method == "POST" { "/api/ads/watched" } else { "/api/ads/access" })
            .header("x-droplink-session", "browser-1")
            .body(Body::empty())
            .unwrap()
    };

    let (_, body) = send(&app, with_session("GET")).await;
    assert_eq!(body["hasAccess"], false);
    let (status, _) = send(&app, with_session("POST")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, with_session("GET")).await;
    assert_eq!(body["hasAccess"], true);
    let (status, _) = send(&app, with_session("DELETE")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, with_session("GET")).await;
    assert_eq!(body["hasAccess"], false);

    let (status, _) = send(&app, request("GET", "/api/ads/access", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tip_and_payment_flow() {
    let app = app();
    let (token, profile) = sign_in(&app, "alice").await;
    let username = profile["username"].as_str().unwrap();

    let (status, tip) = send(
        &app,
        request(
            "POST",
            &format!("/api/profiles/{}/tips", username),
            None,
            Some(json!({"amount": 2.5, "message": "great page", "paymentId": "pay_1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tip["status"], "pending");

    let (status, body) = send(
        &app,
        request("POST", "/api/payments/approve", None, Some(json!({"paymentId": "pay_1"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/payments/complete",
            None,
            Some(json!({"paymentId": "pay_1", "txid": "tx_1", "apiKey": "ignored"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["identifier"], "pay_1");

    let (_, body) = send(&app, request("GET", "/api/me/tips", Some(&token), None)).await;
    assert_eq!(body["items"][0]["status"], "completed");
    assert_eq!(body["total"]["count"], 1);

    send(&app, request("POST", "/api/payments/cancel", None, Some(json!({"paymentId": "pay_2"})))).await;
    let (status, body) = send(
        &app,
        request("POST", "/api/payments/complete", None, Some(json!({"paymentId": "pay_2", "txid": "tx"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn forum_reads_are_public_and_writes_need_a_caller() {
    let app = app();
    let (token, _) = sign_in(&app, "alice").await;

    let (status, _) = send(
        &app,
        request("POST", "/api/forum/categories", None, Some(json!({"name": "General"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, cat) = send(
        &app,
        request("POST", "/api/forum/categories", Some(&token), Some(json!({"name": "General"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cat_id = cat["id"].as_str().unwrap();

    let (status, topic) = send(
        &app,
        request(
            "POST",
            &format!("/api/forum/categories/{}/topics", cat_id),
            Some(&token),
            Some(json!({"title": "Hello Pioneers", "body": "First post"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let topic_id = topic["id"].as_str().unwrap();

    let (status, body) = send(&app, request("GET", &format!("/api/forum/topics/{}", topic_id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["viewCount"], 1);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/api/forum/topics/{}/lock", topic_id),
            Some(&token),
            Some(json!({"locked": true})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/api/forum/topics/{}/replies", topic_id),
            Some(&token),
            Some(json!({"body": "too late"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let (_, body) = send(
        &app,
        request("GET", &format!("/api/forum/categories/{}/topics", cat_id), None, None),
    )
    .await;
    assert_eq!(body["total"], 1);
}
