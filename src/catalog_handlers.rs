// src/catalog_handlers.rs
//! Справочники и брони: однотипный CRUD поверх `/api/admin/{resource}`

use actix_web::{web, HttpRequest, HttpResponse};
use reqwest::Method;
use serde_json::Value;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ApiError, ApiResult};
use crate::handlers::{admin_path, forward_json, forward_list, path_id, FriendlyMessages, SharedState};
use crate::listing::FilterSchema;

const CATALOG_MESSAGES: FriendlyMessages = &[
    (404, "Resource not found"),
    (409, "Resource already exists"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Resource {
    Brands,
    Models,
    Colors,
    Categories,
    Locations,
    Bookings,
    Currencies,
    Balances,
}

impl Resource {
    pub fn parse(raw: &str) -> ApiResult<Self> {
        Resource::from_str(raw).map_err(|_| ApiError::not_found(&format!("Resource '{}'", raw)))
    }

    pub fn schema(self) -> FilterSchema {
        match self {
            Resource::Bookings => FilterSchema::for_bookings(),
            other => FilterSchema::for_catalog(other.into()),
        }
    }
}

pub async fn list_resource(
    app_state: SharedState,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let resource = Resource::parse(&path.into_inner())?;
    let schema = app_state.list_schema(resource.schema());
    forward_list(
        &app_state,
        &http_request,
        admin_path(&resource.to_string()),
        &schema,
        CATALOG_MESSAGES,
    )
    .await
}

pub async fn create_resource(
    app_state: SharedState,
    path: web::Path<String>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let resource = Resource::parse(&path.into_inner())?;
    forward_json(
        &app_state,
        &http_request,
        Method::POST,
        admin_path(&resource.to_string()),
        Some(body.into_inner()),
        CATALOG_MESSAGES,
    )
    .await
}

pub async fn get_resource(
    app_state: SharedState,
    path: web::Path<(String, String)>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let (resource, id) = path.into_inner();
    let resource = Resource::parse(&resource)?;
    let id = path_id(&id)?;
    forward_json(
        &app_state,
        &http_request,
        Method::GET,
        admin_path(&format!("{}/{}", resource, id)),
        None,
        CATALOG_MESSAGES,
    )
    .await
}

pub async fn update_resource(
    app_state: SharedState,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let (resource, id) = path.into_inner();
    let resource = Resource::parse(&resource)?;
    let id = path_id(&id)?;
    forward_json(
        &app_state,
        &http_request,
        Method::PUT,
        admin_path(&format!("{}/{}", resource, id)),
        Some(body.into_inner()),
        CATALOG_MESSAGES,
    )
    .await
}

pub async fn delete_resource(
    app_state: SharedState,
    path: web::Path<(String, String)>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let (resource, id) = path.into_inner();
    let resource = Resource::parse(&resource)?;
    let id = path_id(&id)?;
    log::warn!("Deleting {} {}", resource, id);
    forward_json(
        &app_state,
        &http_request,
        Method::DELETE,
        admin_path(&format!("{}/{}", resource, id)),
        None,
        CATALOG_MESSAGES,
    )
    .await
}
