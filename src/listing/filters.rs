// src/listing/filters.rs
//! Типы фильтров списков и схемы фильтров по сущностям

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::codec::ALL;

lazy_static! {
    static ref NON_DIGITS: Regex = Regex::new(r"\D+").unwrap();
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Оставляет в строке только цифры: `12a3` -> `123`
pub fn sanitize_digits(raw: &str) -> String {
    NON_DIGITS.replace_all(raw, "").into_owned()
}

// ==================== FILTER VALUE ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl FilterValue {
    #[inline] pub fn text(s: impl Into<String>) -> Self { FilterValue::Text(s.into()) }

    pub fn as_query_value(&self) -> String {
        match self {
            FilterValue::Text(s) => s.clone(),
            FilterValue::Integer(n) => n.to_string(),
            FilterValue::Boolean(b) => b.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self { FilterValue::Text(s) }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self { FilterValue::Text(s.to_string()) }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self { FilterValue::Integer(n) }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self { FilterValue::Boolean(b) }
}

// ==================== FILTER KIND ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Свободный текст (поиск), применяется с задержкой
    Text,
    /// Выпадающий список, в UI по умолчанию "all"
    Select,
    /// "true"/"false"
    Boolean,
    /// Числовой идентификатор, только цифры
    NumericId,
    /// Дата YYYY-MM-DD
    Date,
}

impl FilterKind {
    /// Приводит значение к виду, допустимому для этого типа фильтра.
    /// `None` означает "фильтра нет" (пусто, "all", мусор).
    pub fn normalize(&self, value: &FilterValue) -> Option<FilterValue> {
        if let FilterValue::Text(s) = value {
            if s.trim().is_empty() || s == ALL {
                return None;
            }
        }

        match self {
            FilterKind::Text => match value {
                FilterValue::Text(s) => Some(FilterValue::Text(s.trim().to_string())),
                other => Some(FilterValue::Text(other.as_query_value())),
            },
            FilterKind::Select => Some(value.clone()),
            FilterKind::Boolean => match value {
                FilterValue::Boolean(b) => Some(FilterValue::Boolean(*b)),
                FilterValue::Text(s) => match s.as_str() {
                    "true" => Some(FilterValue::Boolean(true)),
                    "false" => Some(FilterValue::Boolean(false)),
                    _ => None,
                },
                FilterValue::Integer(_) => None,
            },
            FilterKind::NumericId => {
                let digits = match value {
                    FilterValue::Integer(n) if *n >= 0 => n.to_string(),
                    FilterValue::Text(s) => sanitize_digits(s),
                    _ => String::new(),
                };
                if digits.is_empty() { None } else { Some(FilterValue::Text(digits)) }
            }
            FilterKind::Date => match value {
                FilterValue::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .ok()
                    .map(|d| FilterValue::Text(d.format(DATE_FORMAT).to_string())),
                _ => None,
            },
        }
    }

    /// Текстовые фильтры ждут паузы ввода, остальные применяются сразу
    pub fn is_debounced(&self) -> bool {
        matches!(self, FilterKind::Text)
    }
}

// ==================== FILTER SET / PATCH ====================

/// Разрешённый набор фильтров: ключ присутствует только с конкретным значением
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet(BTreeMap<String, FilterValue>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FilterValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Слияние с явным патчем: ключ в патче перекрывает (`None` снимает фильтр),
    /// ключ вне патча наследуется. Неизвестные схеме ключи отбрасываются.
    pub fn merge(&self, patch: &FilterPatch, schema: &FilterSchema) -> FilterSet {
        let mut resolved = FilterSet::new();

        for field in schema.fields() {
            let candidate = match patch.entry(field.name) {
                Some(explicit) => explicit.cloned(),
                None => self.get(field.name).cloned(),
            };

            if let Some(value) = candidate.and_then(|v| field.kind.normalize(&v)) {
                resolved.insert(field.name, value);
            }
        }

        for name in patch.names() {
            if schema.field(name).is_none() {
                log::warn!("Ignoring unknown filter '{}' for {}", name, schema.resource());
            }
        }

        resolved
    }
}

impl FromIterator<(String, FilterValue)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        FilterSet(iter.into_iter().collect())
    }
}

/// Явные изменения фильтров. Отсутствие ключа = "не трогали",
/// `Some(None)` = "сбросили".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch(BTreeMap<String, Option<FilterValue>>);

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.0.insert(name.into(), Some(value.into()));
        self
    }

    pub fn clear(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), None);
        self
    }

    pub fn put(&mut self, name: impl Into<String>, value: Option<FilterValue>) {
        self.0.insert(name.into(), value);
    }

    /// `None` - ключа в патче нет, `Some(None)` - явный сброс
    pub fn entry(&self, name: &str) -> Option<Option<&FilterValue>> {
        self.0.get(name).map(|v| v.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ==================== FILTER SCHEMA ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: FilterKind,
}

/// Набор фильтров, которые понимает список конкретной сущности
#[derive(Debug, Clone)]
pub struct FilterSchema {
    resource: &'static str,
    fields: Vec<FilterField>,
    default_limit: u32,
}

impl FilterSchema {
    pub fn new(resource: &'static str, default_limit: u32, fields: &[(&'static str, FilterKind)]) -> Self {
        Self {
            resource,
            fields: fields
                .iter()
                .map(|&(name, kind)| FilterField { name, kind })
                .collect(),
            default_limit: default_limit.max(1),
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FilterField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    pub fn for_audit_logs() -> Self {
        Self::new("audit-logs", 20, &[
            ("search", FilterKind::Text),
            ("action", FilterKind::Select),
            ("entity_type", FilterKind::Select),
            ("user_id", FilterKind::NumericId),
            ("date_from", FilterKind::Date),
            ("date_to", FilterKind::Date),
        ])
    }

    pub fn for_subscription_plans() -> Self {
        Self::new("subscription-plans", 10, &[
            ("search", FilterKind::Text),
            ("status", FilterKind::Select),
            ("is_active", FilterKind::Boolean),
        ])
    }

    pub fn for_users() -> Self {
        Self::new("users", 20, &[
            ("search", FilterKind::Text),
            ("role", FilterKind::Select),
            ("status", FilterKind::Select),
            ("is_active", FilterKind::Boolean),
        ])
    }

    pub fn for_bookings() -> Self {
        Self::new("bookings", 20, &[
            ("search", FilterKind::Text),
            ("status", FilterKind::Select),
            ("location_id", FilterKind::NumericId),
            ("user_id", FilterKind::NumericId),
            ("date_from", FilterKind::Date),
            ("date_to", FilterKind::Date),
        ])
    }

    pub fn for_user_workflows() -> Self {
        Self::new("user-workflows", 10, &[
            ("search", FilterKind::Text),
            ("workflowId", FilterKind::NumericId),
            ("status", FilterKind::Select),
        ])
    }

    /// Справочники: бренды, модели, цвета, категории, локации, валюты, балансы
    pub fn for_catalog(resource: &'static str) -> Self {
        Self::new(resource, 20, &[
            ("search", FilterKind::Text),
            ("status", FilterKind::Select),
        ])
    }
}
