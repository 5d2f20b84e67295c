// src/automation_handlers.rs
//! Воркфлоу автоматизаций (инстансы n8n) и их привязки к пользователям

use actix_web::{web, HttpRequest, HttpResponse};
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiResult;
use crate::handlers::{
    admin_path, forward_json, forward_list, numeric_path_id, path_id, FriendlyMessages, SharedState,
};
use crate::listing::FilterSchema;

const WORKFLOW_MESSAGES: FriendlyMessages = &[(404, "Workflow not found")];

pub async fn update_workflow(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let id = path_id(&path.into_inner())?;
    log::info!("Updating workflow {}", id);
    forward_json(
        &app_state,
        &http_request,
        Method::PUT,
        admin_path(&format!("automations/workflows/{}", id)),
        Some(body.into_inner()),
        WORKFLOW_MESSAGES,
    )
    .await
}

/// Привязки пользователей к воркфлоу: список с фильтрами `search`, `status`
pub async fn get_user_workflows(
    app_state: SharedState,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let workflow_id = numeric_path_id(&path.into_inner(), "workflowId")?;
    let schema = FilterSchema::for_user_workflows();
    forward_list(
        &app_state,
        &http_request,
        admin_path(&format!("automations/user-workflows/{}", workflow_id)),
        &schema,
        WORKFLOW_MESSAGES,
    )
    .await
}

pub async fn create_user_workflow(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let workflow_id = numeric_path_id(&path.into_inner(), "workflowId")?;
    forward_json(
        &app_state,
        &http_request,
        Method::POST,
        admin_path(&format!("automations/user-workflows/{}", workflow_id)),
        Some(body.into_inner()),
        WORKFLOW_MESSAGES,
    )
    .await
}
