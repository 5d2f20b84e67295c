// src/plan_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiResult;
use crate::handlers::{admin_path, forward_json, forward_list, path_id, FriendlyMessages, SharedState};
use crate::listing::FilterSchema;
use crate::models::{validated_body, PlanFeaturesRequest};

const PLAN_MESSAGES: FriendlyMessages = &[(404, "Subscription plan not found")];

// ==================== SUBSCRIPTION PLANS ====================

pub async fn list_plans(
    app_state: SharedState,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let schema = FilterSchema::for_subscription_plans();
    forward_list(&app_state, &http_request, admin_path("subscription-plans"), &schema, PLAN_MESSAGES).await
}

pub async fn get_plan(
    app_state: SharedState,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::GET,
        admin_path(&format!("subscription-plans/{}", id)),
        None,
        PLAN_MESSAGES,
    )
    .await
}

pub async fn update_plan(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    log::info!("Updating subscription plan {}", id);
    forward_json(
        &app_state,
        &http_request,
        Method::PUT,
        admin_path(&format!("subscription-plans/{}", id)),
        Some(body.into_inner()),
        PLAN_MESSAGES,
    )
    .await
}

pub async fn update_plan_features(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    let body = validated_body::<PlanFeaturesRequest>(body.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::PUT,
        admin_path(&format!("subscription-plans/{}/features", id)),
        Some(body),
        PLAN_MESSAGES,
    )
    .await
}
