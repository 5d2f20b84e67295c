// src/handlers.rs
//! Общие части прокси-обработчиков `/api/admin/**` и таблица маршрутов.
//!
//! Каждый обработчик: токен из запроса -> запрос к бэкенду с тем же токеном
//! -> ответ бэкенда в конверте `Envelope`.

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::require_token;
use crate::backend::{BackendClient, BackendRequest, REQUEST_ID_HEADER};
use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::listing::{decode, FilterSchema};
use crate::{audit_handlers, automation_handlers, catalog_handlers};
use crate::{permission_handlers, plan_handlers, user_handlers};

// ==================== APP STATE ====================

pub struct AppState {
    pub backend: BackendClient,
    pub config: Config,
}

impl AppState {
    pub fn new(backend: BackendClient, config: Config) -> Self {
        Self { backend, config }
    }

    /// Схема списка без собственного размера страницы берёт его из конфигурации
    pub fn list_schema(&self, schema: FilterSchema) -> FilterSchema {
        schema.with_default_limit(self.config.listing.default_limit)
    }
}

// ==================== RESPONSES ====================

/// Понятные тексты для статусов конкретного маршрута
pub type FriendlyMessages = &'static [(u16, &'static str)];

pub const NO_OVERRIDES: FriendlyMessages = &[];

pub fn respond(envelope: Envelope) -> HttpResponse {
    let status = StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::OK);
    HttpResponse::build(status).json(envelope)
}

/// Маршрутный текст заменяет сообщение бэкенда для перечисленных статусов
pub fn friendly_error(err: ApiError, friendly: FriendlyMessages) -> ApiError {
    match err {
        ApiError::Upstream { status, message } => {
            let message = friendly
                .iter()
                .find(|(code, _)| *code == status)
                .map(|(_, text)| text.to_string())
                .unwrap_or(message);
            ApiError::Upstream { status, message }
        }
        other => other,
    }
}

/// `x-request-id` входящего запроса, иначе новый
pub fn request_id(req: &HttpRequest) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// `/api/admin/x` проксируется на `{backend}/admin/x`
pub fn admin_path(rest: &str) -> String {
    format!("admin/{}", rest.trim_start_matches('/'))
}

/// Id в пути: непустой, не `.`/`..` и без разделителей пути, запроса и фрагмента
pub fn path_id(raw: &str) -> ApiResult<String> {
    let id = raw.trim();
    let forbidden = |c: char| matches!(c, '/' | '\\' | '?' | '#' | '%');
    if id.is_empty() || id == "." || id == ".." || id.contains(forbidden) {
        return Err(ApiError::BadRequest(format!("Invalid id '{}'", raw)));
    }
    Ok(id.to_string())
}

/// Числовой id в пути (например, workflowId)
pub fn numeric_path_id(raw: &str, field: &str) -> ApiResult<String> {
    let id = raw.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::invalid_id(field));
    }
    Ok(id.to_string())
}

// ==================== FORWARDING ====================

/// Проксирует одиночный ресурс. Ответ: `data` из `body.data`, иначе всё тело.
pub async fn forward_json(
    state: &AppState,
    req: &HttpRequest,
    method: Method,
    path: String,
    body: Option<Value>,
    friendly: FriendlyMessages,
) -> ApiResult<HttpResponse> {
    let token = require_token(req)?;

    let mut request = BackendRequest::new(method, path)
        .token(Some(&token))
        .request_id(request_id(req));
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = state
        .backend
        .send(request)
        .await
        .map_err(|err| friendly_error(err, friendly))?;

    Ok(respond(Envelope::from_backend(response.status, response.body)))
}

/// Проксирует список: входящий query разбирается схемой сущности ("all" и
/// пустые значения отбрасываются, id санитизируются, лимит проверяется),
/// бэкенду уходит каноническая строка. Ответ выравнивается в `data = items`.
pub async fn forward_list(
    state: &AppState,
    req: &HttpRequest,
    path: String,
    schema: &FilterSchema,
    friendly: FriendlyMessages,
) -> ApiResult<HttpResponse> {
    let token = require_token(req)?;

    let decoded = decode(schema, req.query_string());
    decoded.page.validate(state.config.listing.max_limit)?;
    let query = decoded.canonical(schema);

    let request = BackendRequest::get(path)
        .query(query)
        .token(Some(&token))
        .request_id(request_id(req));

    let response = state
        .backend
        .send(request)
        .await
        .map_err(|err| friendly_error(err, friendly))?;

    Ok(respond(Envelope::list_from_backend(response.status, &response.body, decoded.page)))
}

// ==================== ROUTES ====================

/// Маршруты `/api/admin`. Конкретные ресурсы регистрируются раньше
/// обобщённого `/{resource}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .service(
                web::scope("/subscription-plans")
                    .route("", web::get().to(plan_handlers::list_plans))
                    .route("/{id}", web::get().to(plan_handlers::get_plan))
                    .route("/{id}", web::put().to(plan_handlers::update_plan))
                    .route("/{id}/features", web::put().to(plan_handlers::update_plan_features))
            )
            .service(
                web::scope("/permissions")
                    .route("/roles", web::get().to(permission_handlers::get_roles))
                    .route("/roles", web::post().to(permission_handlers::create_role))
                    .route("/users/{user_id}/roles", web::get().to(permission_handlers::get_user_roles))
                    .route("/users/{user_id}/roles", web::post().to(permission_handlers::assign_user_roles))
            )
            .service(
                web::scope("/automations")
                    .route("/workflows/{id}", web::put().to(automation_handlers::update_workflow))
                    .route("/user-workflows/{workflow_id}", web::get().to(automation_handlers::get_user_workflows))
                    .route("/user-workflows/{workflow_id}", web::post().to(automation_handlers::create_user_workflow))
            )
            .service(
                web::scope("/users")
                    .route("", web::get().to(user_handlers::list_users))
                    .route("", web::post().to(user_handlers::create_user))
                    .route("/{id}", web::get().to(user_handlers::get_user))
                    .route("/{id}", web::put().to(user_handlers::update_user))
                    .route("/{id}", web::delete().to(user_handlers::delete_user))
                    .route("/{id}/password", web::put().to(user_handlers::update_user_password))
            )
            .route("/audit-logs", web::get().to(audit_handlers::list_audit_logs))
            .route("/{resource}", web::get().to(catalog_handlers::list_resource))
            .route("/{resource}", web::post().to(catalog_handlers::create_resource))
            .route("/{resource}/{id}", web::get().to(catalog_handlers::get_resource))
            .route("/{resource}/{id}", web::put().to(catalog_handlers::update_resource))
            .route("/{resource}/{id}", web::delete().to(catalog_handlers::delete_resource)),
    );
}

pub type SharedState = web::Data<Arc<AppState>>;
