// src/backend.rs
//! HTTP-клиент внешнего бэкенда: пробрасывает bearer-токен, приводит ответы
//! к `BackendResponse` и раскладывает сбои по таксономии `ApiError`.

use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{normalize_api_url, BackendConfig};
use crate::envelope::message_of;
use crate::error::{ApiError, ApiResult};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Сырой текст ошибки обрезаем, чтобы не отдавать в UI HTML-страницы целиком
const MAX_RAW_MESSAGE: usize = 200;

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub token: Option<String>,
    pub body: Option<Value>,
    pub request_id: String,
}

impl BackendRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            token: None,
            body: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = if query.is_empty() { None } else { Some(query) };
        self
    }

    pub fn token(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Value,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ApiError::InternalServerError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(http, &config.api_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: normalize_api_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Бэкенд доступен, если ответил хоть каким-то HTTP-статусом
    pub async fn ping(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(response) => {
                log::debug!("Backend ping -> {}", response.status());
                true
            }
            Err(e) => {
                log::warn!("Backend ping failed: {}", e);
                false
            }
        }
    }

    #[tracing::instrument(
        name = "backend",
        skip(self, request),
        fields(method = %request.method, path = %request.path, request_id = %request.request_id)
    )]
    pub async fn send(&self, request: BackendRequest) -> ApiResult<BackendResponse> {
        let mut url = self.url_for(&request.path);
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(REQUEST_ID_HEADER, &request.request_id)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            log::warn!("Backend request {} {} failed: {}", request.method, url, e);
            ApiError::Transport(format!("Failed to reach backend: {}", e))
        })?;

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let text = response.text().await.map_err(|e| {
            ApiError::Transport(format!("Failed to read backend response: {}", e))
        })?;

        log::debug!("Backend {} {} -> {}", request.method, url, status);

        if success {
            let body = parse_success_body(status, &text)?;
            Ok(BackendResponse { status, body })
        } else {
            Err(upstream_error(status, &text))
        }
    }
}

fn parse_success_body(status: u16, text: &str) -> ApiResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|_| {
        ApiError::Parse(format!("Backend returned a non-JSON body (status {})", status))
    })
}

/// Ошибка для не-2xx ответа: `message` бэкенда, иначе стандартный текст
/// по статусу, иначе сырой текст тела, иначе "Backend returned status N".
pub fn upstream_error(status: u16, text: &str) -> ApiError {
    let message = match serde_json::from_str::<Value>(text) {
        Ok(body) => message_of(&body)
            .or_else(|| canned_message(status).map(str::to_string)),
        Err(_) => {
            let raw = text.trim();
            if raw.is_empty() {
                None
            } else {
                Some(raw.chars().take(MAX_RAW_MESSAGE).collect())
            }
        }
    };

    match message {
        Some(message) => ApiError::Upstream { status, message },
        None => ApiError::backend_status(status),
    }
}

pub fn canned_message(status: u16) -> Option<&'static str> {
    match status {
        401 => Some("Session expired, please sign in again"),
        403 => Some("You do not have permission to perform this action"),
        404 => Some("Resource not found"),
        409 => Some("Resource already exists"),
        _ => None,
    }
}
