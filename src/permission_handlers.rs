// src/permission_handlers.rs
//! Роли и назначение ролей пользователям

use actix_web::{web, HttpRequest, HttpResponse};
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiResult;
use crate::handlers::{admin_path, forward_json, path_id, FriendlyMessages, SharedState};
use crate::models::{validated_body, AssignRolesRequest, CreateRoleRequest};

const ROLE_MESSAGES: FriendlyMessages = &[(409, "Role already exists")];
const USER_ROLE_MESSAGES: FriendlyMessages = &[(404, "User not found")];

pub async fn get_roles(
    app_state: SharedState,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    forward_json(
        &app_state,
        &http_request,
        Method::GET,
        admin_path("permissions/roles"),
        None,
        ROLE_MESSAGES,
    )
    .await
}

pub async fn create_role(
    app_state: SharedState,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let body = validated_body::<CreateRoleRequest>(body.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::POST,
        admin_path("permissions/roles"),
        Some(body),
        ROLE_MESSAGES,
    )
    .await
}

pub async fn get_user_roles(
    app_state: SharedState,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user_id = path_id(&path.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::GET,
        admin_path(&format!("permissions/users/{}/roles", user_id)),
        None,
        USER_ROLE_MESSAGES,
    )
    .await
}

pub async fn assign_user_roles(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user_id = path_id(&path.into_inner())?;
    let body = validated_body::<AssignRolesRequest>(body.into_inner())?;
    log::info!("Assigning roles to user {}", user_id);
    forward_json(
        &app_state,
        &http_request,
        Method::POST,
        admin_path(&format!("permissions/users/{}/roles", user_id)),
        Some(body),
        USER_ROLE_MESSAGES,
    )
    .await
}

#[cfg(test)]
mod tests {
    use crate::handlers::configure_routes;
    use crate::handlers::testing::{app_data, state_for};
    use crate::test_support::MockBackend;
    use actix_web::{test as actix_test, App};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_roles_are_unwrapped_from_data() {
        let mock = MockBackend::new().respond(
            "GET",
            "/admin/permissions/roles",
            200,
            json!({"data": [{"id": 1, "name": "admin"}], "message": "ok"}),
        );
        let state = state_for(mock).await;
        let app = actix_test::init_service(App::new().app_data(app_data(state)).configure(configure_routes)).await;

        let req = actix_test::TestRequest::get()
            .uri("/api/admin/permissions/roles")
            .insert_header(("Authorization", "Bearer tok"))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["message"], "ok");
        assert_eq!(body["data"][0]["name"], "admin");
    }

    #[actix_rt::test]
    async fn test_assign_roles_validates_then_forwards() {
        let mock = MockBackend::new().respond(
            "POST",
            "/admin/permissions/users/17/roles",
            201,
            json!({"data": {"userId": 17, "roleIds": [2]}}),
        );
        let state = state_for(mock.clone()).await;
        let app = actix_test::init_service(App::new().app_data(app_data(state)).configure(configure_routes)).await;

        let empty = actix_test::TestRequest::post()
            .uri("/api/admin/permissions/users/17/roles")
            .insert_header(("Authorization", "Bearer tok"))
            .set_json(json!({"roleIds": []}))
            .to_request();
        assert_eq!(actix_test::call_service(&app, empty).await.status(), 422);

        let ok = actix_test::TestRequest::post()
            .uri("/api/admin/permissions/users/17/roles")
            .insert_header(("Authorization", "Bearer tok"))
            .set_json(json!({"roleIds": [2]}))
            .to_request();
        let resp = actix_test::call_service(&app, ok).await;
        assert_eq!(resp.status(), 201);

        let seen = mock.requests();
        assert_eq!(seen.len(), 1);
        let forwarded: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(forwarded["roleIds"], json!([2]));
    }
}
