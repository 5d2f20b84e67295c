// src/envelope.rs
//! Конверт ответа `{status, message, data, total?, page?, limit?}` и
//! нормализация списочных ответов бэкенда.
//!
//! Бэкенд отдаёт списки в трёх формах, и шлюз, и клиент принимают все три:
//! - голый массив `[...]`
//! - `{ "data": [...], "total": N }`
//! - `{ "data": { "items": [...], "total": N, "page": P, "limit": L } }`

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::listing::PageState;

// ==================== ENVELOPE ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Envelope {
    pub fn success(status: u16, data: Value) -> Self {
        Self {
            status,
            message: None,
            data,
            total: None,
            page: None,
            limit: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Одиночный ресурс: `data` берётся из `body.data`, иначе всё тело целиком.
    pub fn from_backend(status: u16, body: Value) -> Self {
        let message = message_of(&body);
        let data = match body {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };

        Self {
            status,
            message,
            data,
            total: None,
            page: None,
            limit: None,
        }
    }

    /// Списочный ресурс: `data` становится массивом элементов, пагинация
    /// поднимается на верхний уровень.
    pub fn list_from_backend(status: u16, body: &Value, requested: PageState) -> Self {
        let result = CollectionResult::from_body(body, requested);
        Self {
            status,
            message: message_of(body),
            data: Value::Array(result.items),
            total: Some(result.total),
            page: Some(result.page),
            limit: Some(result.limit),
        }
    }
}

/// Поле `message` ответа: строка или массив строк (валидационные ошибки бэкенда).
pub fn message_of(body: &Value) -> Option<String> {
    match body.get("message")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        _ => None,
    }
}

// ==================== COLLECTION RESULT ====================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> CollectionResult<T> {
    pub fn empty(page: PageState) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: page.page,
            limit: page.limit,
        }
    }
}

impl CollectionResult<Value> {
    /// Приводит любую из трёх форм к одному виду. Отсутствующие `page`/`limit`
    /// берутся из запроса, отсутствующий `total` равен числу элементов.
    pub fn from_body(body: &Value, requested: PageState) -> Self {
        let (items, meta): (Vec<Value>, Option<&Value>) = match body {
            Value::Array(items) => (items.clone(), None),
            Value::Object(map) => match map.get("data") {
                Some(Value::Array(items)) => (items.clone(), Some(body)),
                Some(nested) => match nested.get("items") {
                    Some(Value::Array(items)) => (items.clone(), Some(nested)),
                    _ => (Vec::new(), None),
                },
                None => (Vec::new(), None),
            },
            _ => (Vec::new(), None),
        };

        let read_u64 = |key: &str| meta.and_then(|m| m.get(key)).and_then(as_u64_lenient);
        let total = read_u64("total").unwrap_or(items.len() as u64);
        let page = read_u64("page")
            .and_then(|p| u32::try_from(p).ok())
            .filter(|p| *p >= 1)
            .unwrap_or(requested.page);
        let limit = read_u64("limit")
            .and_then(|l| u32::try_from(l).ok())
            .filter(|l| *l >= 1)
            .unwrap_or(requested.limit);

        Self { items, total, page, limit }
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> ApiResult<CollectionResult<T>> {
        let items = self
            .items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| ApiError::Parse(format!("Unexpected list item shape: {}", e)))?;

        Ok(CollectionResult {
            items,
            total: self.total,
            page: self.page,
            limit: self.limit,
        })
    }
}

// Бэкенд иногда присылает числа строками ("50")
fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
