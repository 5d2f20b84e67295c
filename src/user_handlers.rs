// src/user_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiResult;
use crate::handlers::{admin_path, forward_json, forward_list, path_id, FriendlyMessages, SharedState};
use crate::listing::FilterSchema;
use crate::models::{validated_body, CreateUserRequest, UpdatePasswordRequest, UpdateUserRequest};

const USER_MESSAGES: FriendlyMessages = &[
    (404, "User not found"),
    (409, "User already exists"),
];

// ==================== USERS ====================

pub async fn list_users(
    app_state: SharedState,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let schema = app_state.list_schema(FilterSchema::for_users());
    forward_list(&app_state, &http_request, admin_path("users"), &schema, USER_MESSAGES).await
}

pub async fn create_user(
    app_state: SharedState,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let body = validated_body::<CreateUserRequest>(body.into_inner())?;
    forward_json(&app_state, &http_request, Method::POST, admin_path("users"), Some(body), USER_MESSAGES).await
}

pub async fn get_user(
    app_state: SharedState,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::GET,
        admin_path(&format!("users/{}", id)),
        None,
        USER_MESSAGES,
    )
    .await
}

pub async fn update_user(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    let body = validated_body::<UpdateUserRequest>(body.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::PUT,
        admin_path(&format!("users/{}", id)),
        Some(body),
        USER_MESSAGES,
    )
    .await
}

pub async fn delete_user(
    app_state: SharedState,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    log::warn!("Deleting user {}", id);
    forward_json(
        &app_state,
        &http_request,
        Method::DELETE,
        admin_path(&format!("users/{}", id)),
        None,
        USER_MESSAGES,
    )
    .await
}

pub async fn update_user_password(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    let body = validated_body::<UpdatePasswordRequest>(body.into_inner())?;
    log::info!("Changing password for user {}", id);
    forward_json(
        &app_state,
        &http_request,
        Method::PUT,
        admin_path(&format!("users/{}/password", id)),
        Some(body),
        USER_MESSAGES,
    )
    .await
}
