// src/listing/client.rs
//! Удалённый источник списка

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

use reqwest::Method;

use crate::backend::{BackendClient, BackendRequest};
use crate::envelope::{CollectionResult, Envelope};
use crate::error::{ApiError, ApiResult};
use super::codec::encode;
use super::filters::FilterSchema;
use super::ListRequest;

/// Источник данных для `CollectionStore`. Повторов нет: ошибка уходит в стор,
/// повтор делает пользователь.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    async fn fetch_list(&self, request: &ListRequest) -> ApiResult<CollectionResult<T>>;

    async fn create(&self, body: Value) -> ApiResult<T>;

    async fn update(&self, id: &str, body: Value) -> ApiResult<T>;

    async fn delete(&self, id: &str) -> ApiResult<()>;
}

/// REST-источник: `GET {resource}?page&limit&...`, `POST {resource}`,
/// `PUT/DELETE {resource}/{id}`
pub struct HttpListClient<T> {
    backend: BackendClient,
    resource_path: String,
    schema: FilterSchema,
    token: Option<String>,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpListClient<T> {
    pub fn new(backend: BackendClient, resource_path: impl Into<String>, schema: FilterSchema) -> Self {
        Self {
            backend,
            resource_path: resource_path.into().trim_matches('/').to_string(),
            schema,
            token: None,
            _item: PhantomData,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    fn item_path(&self, id: &str) -> ApiResult<String> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ApiError::ValidationError(format!("Invalid id '{}'", id)));
        }
        Ok(format!("{}/{}", self.resource_path, id))
    }

    fn request(&self, method: Method, path: String) -> BackendRequest {
        BackendRequest::new(method, path).token(self.token.as_deref())
    }
}

fn typed<T: DeserializeOwned>(status: u16, body: Value) -> ApiResult<T> {
    let envelope = Envelope::from_backend(status, body);
    serde_json::from_value(envelope.data)
        .map_err(|e| ApiError::Parse(format!("Unexpected item shape: {}", e)))
}

#[async_trait]
impl<T> ListSource<T> for HttpListClient<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_list(&self, request: &ListRequest) -> ApiResult<CollectionResult<T>> {
        let query = encode(&self.schema, &request.filters, request.page);
        let response = self
            .backend
            .send(self.request(Method::GET, self.resource_path.clone()).query(query))
            .await?;

        CollectionResult::from_body(&response.body, request.page).into_typed()
    }

    async fn create(&self, body: Value) -> ApiResult<T> {
        let response = self
            .backend
            .send(self.request(Method::POST, self.resource_path.clone()).json(body))
            .await?;
        typed(response.status, response.body)
    }

    async fn update(&self, id: &str, body: Value) -> ApiResult<T> {
        let path = self.item_path(id)?;
        let response = self
            .backend
            .send(self.request(Method::PUT, path).json(body))
            .await?;
        typed(response.status, response.body)
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let path = self.item_path(id)?;
        self.backend.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}
