// src/models.rs
//! DTO входящих запросов админки. Проверяются только поля, которые шлюз
//! обязан отсечь до бэкенда; остальные поля проходят к бэкенду как есть.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::ApiResult;

// ==================== USERS ====================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// `None` - поле не передано, `Some(None)` - явный `null`
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<Option<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ==================== PERMISSIONS ====================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignRolesRequest {
    #[serde(rename = "roleIds")]
    #[validate(length(min = 1, message = "At least one role must be selected"))]
    pub role_ids: Vec<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ==================== SUBSCRIPTION PLANS ====================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlanFeaturesRequest {
    pub features: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Разбор тела в DTO, проверка и обратное превращение в JSON для бэкенда
pub fn validated_body<T>(body: Value) -> ApiResult<Value>
where
    T: for<'de> Deserialize<'de> + Serialize + Validate,
{
    let dto: T = serde_json::from_value(body)
        .map_err(|e| crate::error::ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    dto.validate()?;
    Ok(serde_json::to_value(dto)?)
}
