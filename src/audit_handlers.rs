// src/audit_handlers.rs
use actix_web::{HttpRequest, HttpResponse};

use crate::error::ApiResult;
use crate::handlers::{admin_path, forward_list, SharedState, NO_OVERRIDES};
use crate::listing::FilterSchema;

/// Журнал аудита: только чтение, фильтры по действию, сущности, пользователю и датам
pub async fn list_audit_logs(
    app_state: SharedState,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let schema = app_state.list_schema(FilterSchema::for_audit_logs());
    forward_list(&app_state, &http_request, admin_path("audit-logs"), &schema, NO_OVERRIDES).await
}
