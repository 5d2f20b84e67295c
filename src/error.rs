use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InternalServerError(String),
    ValidationError(String),
    /// Бэкенд недоступен или запрос оборвался до получения ответа
    Transport(String),
    /// Бэкенд ответил не-2xx статусом
    Upstream { status: u16, message: String },
    /// Ответ бэкенда не является JSON
    Parse(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    data: Option<()>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::Transport(msg) => write!(f, "Backend unavailable: {}", msg),
            ApiError::Upstream { message, .. } => write!(f, "{}", message),
            ApiError::Parse(msg) => write!(f, "Invalid backend response: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Сообщение без префикса категории, для поля `message` конверта и `error` стора
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ValidationError(msg)
            | ApiError::Transport(msg)
            | ApiError::Parse(msg) => msg.clone(),
            ApiError::Upstream { message, .. } => message.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Transport(_) | ApiError::Parse(_) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::ValidationError(_) | ApiError::BadRequest(_))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        HttpResponse::build(status).json(ErrorResponse {
            status: status.as_u16(),
            message: self.message(),
            data: None,
        })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

// Частые ошибки шлюза
impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{} not found", entity))
    }

    pub fn missing_token() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }

    pub fn limit_exceeded(limit: u32, max: u32) -> Self {
        ApiError::ValidationError(format!("limit must not exceed {} (got {})", max, limit))
    }

    pub fn invalid_id(field: &str) -> Self {
        ApiError::ValidationError(format!("{} must be numeric", field))
    }

    pub fn backend_status(status: u16) -> Self {
        ApiError::Upstream {
            status,
            message: format!("Backend returned status {}", status),
        }
    }
}
