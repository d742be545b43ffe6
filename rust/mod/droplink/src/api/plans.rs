use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use droplink_core::ServiceError;

use crate::api::AppState;
use crate::model::Claims;
use crate::plan::{check_feature_access, plan_features, Feature, FeatureAccess, PlanFeatures, PlanTier};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/plans", get(list_plans))
        .route("/api/plans/{plan}", get(get_plan))
        .route("/api/me/features", get(my_features))
        .route("/api/me/features/{feature}", get(my_feature))
}

#[derive(Serialize)]
struct PlanInfo {
    plan: PlanTier,
    features: PlanFeatures,
}

fn info(plan: PlanTier) -> PlanInfo {
    PlanInfo {
        plan,
        features: plan_features(plan),
    }
}

/// GET /api/plans — every tier, cheapest first.
async fn list_plans() -> Json<serde_json::Value> {
    let items: Vec<PlanInfo> = PlanTier::ALL.into_iter().map(info).collect();
    Json(serde_json::json!({ "items": items }))
}

/// GET /api/plans/{plan} — `basic` and `elite` resolve to their tiers.
async fn get_plan(Path(name): Path<String>) -> Result<Json<PlanInfo>, ServiceError> {
    let plan = name
        .parse::<PlanTier>()
        .map_err(|e| ServiceError::NotFound(e.to_string()))?;
    Ok(Json(info(plan)))
}

/// GET /api/me/features — the caller's plan and everything it unlocks.
async fn my_features(
    State(svc): State<AppState>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let profile = svc.get_profile(&claims.sub).map_err(ServiceError::from)?;
    let features = plan_features(profile.plan);
    let enabled: Vec<&str> = Feature::ALL
        .into_iter()
        .filter(|f| f.enabled_in(&features))
        .map(|f| f.name())
        .collect();
    Ok(Json(serde_json::json!({
        "plan": profile.plan,
        "features": features,
        "enabled": enabled,
    })))
}

/// GET /api/me/features/{feature} — `{hasAccess, requiredPlan?}`.
async fn my_feature(
    State(svc): State<AppState>,
    claims: Claims,
    Path(feature): Path<String>,
) -> Result<Json<FeatureAccess>, ServiceError> {
    let profile = svc.get_profile(&claims.sub).map_err(ServiceError::from)?;
    Ok(Json(check_feature_access(profile.plan, &feature)))
}
