// src/listing/codec.rs
//! Кодек фильтров: FilterSet + PageState <-> строка запроса URL

use std::collections::BTreeMap;
use url::form_urlencoded;

use super::filters::{FilterKind, FilterPatch, FilterSchema, FilterSet, FilterValue};
use super::store::FetchRequest;
use super::PageState;

/// Значение select-контрола "без ограничения". Живёт только в `ControlState`.
pub const ALL: &str = "all";

// ==================== ENCODE ====================

/// Кодирует состояние списка в query string. `page` и `limit` пишутся всегда,
/// фильтры - только с конкретным значением.
pub fn encode(schema: &FilterSchema, filters: &FilterSet, page: PageState) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("page", &page.page.to_string());
    serializer.append_pair("limit", &page.limit.to_string());

    for field in schema.fields() {
        let Some(value) = filters.get(field.name) else { continue };
        if let Some(value) = field.kind.normalize(value) {
            serializer.append_pair(field.name, &value.as_query_value());
        }
    }

    serializer.finish()
}

// ==================== DECODE ====================

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedQuery {
    pub page: PageState,
    pub filters: FilterSet,
    pub controls: ControlState,
    /// В исходной строке были невалидные параметры; URL надо заменить на `canonical()`
    pub needs_rewrite: bool,
}

impl DecodedQuery {
    /// Каноническая (санитизированная) форма, она же строка сравнения
    pub fn canonical(&self, schema: &FilterSchema) -> String {
        encode(schema, &self.filters, self.page)
    }

    /// Запрос к стору: всё, чего нет в URL, явно сбрасывается
    pub fn to_fetch_request(&self, schema: &FilterSchema) -> FetchRequest {
        let mut patch = FilterPatch::new();
        for field in schema.fields() {
            patch.put(field.name, self.filters.get(field.name).cloned());
        }

        FetchRequest {
            page: Some(self.page.page),
            limit: Some(self.page.limit),
            filters: patch,
        }
    }

    /// Правка одного фильтра из UI. Любое изменение фильтра возвращает на первую страницу.
    pub fn edit(&mut self, schema: &FilterSchema, name: &str, raw: &str) {
        let Some(field) = schema.field(name) else {
            log::warn!("Ignoring edit of unknown filter '{}' for {}", name, schema.resource());
            return;
        };

        match field.kind.normalize(&FilterValue::text(raw)) {
            Some(value) => self.filters.insert(name, value),
            None => {
                self.filters.remove(name);
            }
        }
        self.controls = ControlState::from_filters(schema, &self.filters);
        self.page.page = 1;
    }
}

pub fn decode(schema: &FilterSchema, query: &str) -> DecodedQuery {
    let query = query.trim_start_matches('?');
    let mut page = PageState::first(schema.default_limit());
    let mut filters = FilterSet::new();
    let mut needs_rewrite = false;

    for (key, raw) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "page" => match raw.trim().parse::<u32>() {
                Ok(p) if p >= 1 => page.page = p,
                _ => needs_rewrite = true,
            },
            "limit" => match raw.trim().parse::<u32>() {
                Ok(l) if l >= 1 => page.limit = l,
                _ => needs_rewrite = true,
            },
            name => {
                let Some(field) = schema.field(name) else { continue };
                let normalized = field.kind.normalize(&FilterValue::text(raw.as_ref()));

                if raw_is_invalid(field.kind, raw.as_ref(), normalized.as_ref()) {
                    needs_rewrite = true;
                }
                if let Some(value) = normalized {
                    filters.insert(field.name, value);
                }
            }
        }
    }

    let controls = ControlState::from_filters(schema, &filters);
    DecodedQuery { page, filters, controls, needs_rewrite }
}

/// Сырое значение требует исправления URL: id с нецифровыми символами,
/// неразбираемая дата или булево значение. Пустое значение и "all" допустимы.
fn raw_is_invalid(kind: FilterKind, raw: &str, normalized: Option<&FilterValue>) -> bool {
    if raw.trim().is_empty() || raw == ALL {
        return false;
    }
    match kind {
        FilterKind::NumericId => normalized.and_then(FilterValue::as_str) != Some(raw),
        FilterKind::Date | FilterKind::Boolean => normalized.is_none(),
        FilterKind::Text | FilterKind::Select => false,
    }
}

// ==================== CONTROL STATE ====================

/// Значения UI-контролов. Единственное место, где существует строка "all":
/// select и булевы фильтры без значения показываются как "all", остальные пустыми.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState(BTreeMap<String, String>);

impl ControlState {
    pub fn from_filters(schema: &FilterSchema, filters: &FilterSet) -> Self {
        let controls = schema
            .fields()
            .iter()
            .map(|field| {
                let value = match filters.get(field.name) {
                    Some(v) => v.as_query_value(),
                    None if matches!(field.kind, FilterKind::Select | FilterKind::Boolean) => ALL.to_string(),
                    None => String::new(),
                };
                (field.name.to_string(), value)
            })
            .collect();
        ControlState(controls)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Перевод контролов в патч: "all" и пустые значения становятся явным сбросом
    pub fn to_patch(&self) -> FilterPatch {
        let mut patch = FilterPatch::new();
        for (name, value) in &self.0 {
            if value.trim().is_empty() || value == ALL {
                patch.put(name.clone(), None);
            } else {
                patch.put(name.clone(), Some(FilterValue::text(value.clone())));
            }
        }
        patch
    }
}
