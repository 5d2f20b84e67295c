// src/listing/store.rs
//! Стор коллекции: текущая страница, фильтры, флаги загрузки и ошибки.
//!
//! Писатель один - действия стора; читатели получают копию снимка.
//! Каждый запрос получает номер поколения, и применяется только ответ
//! на последний выданный запрос: устаревший ответ, пришедший позже,
//! отбрасывается, какой бы ни была очерёдность завершения.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::error::ApiResult;
use super::client::ListSource;
use super::filters::{FilterPatch, FilterSchema, FilterSet, FilterValue};
use super::{ListRequest, PageState};

// ==================== REQUEST / OUTCOME ====================

/// Запрос на загрузку: `None` у page/limit означает "как сейчас"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub filters: FilterPatch,
}

impl FetchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters = self.filters.set(name, value);
        self
    }

    pub fn clear(mut self, name: impl Into<String>) -> Self {
        self.filters = self.filters.clear(name);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Ответ применён к снимку
    Applied,
    /// Пока запрос выполнялся, был выдан более новый; ответ отброшен
    Superseded,
}

// ==================== SNAPSHOT ====================

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub filters: FilterSet,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> StoreSnapshot<T> {
    fn initial(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            limit,
            filters: FilterSet::new(),
            is_loading: false,
            error: None,
        }
    }

    pub fn page_state(&self) -> PageState {
        PageState::new(self.page, self.limit)
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit as u64)
    }
}

// ==================== STORE ====================

pub struct CollectionStore<T, S> {
    source: S,
    schema: FilterSchema,
    max_limit: u32,
    state: RwLock<StoreSnapshot<T>>,
    generation: AtomicU64,
    last_request: RwLock<Option<ListRequest>>,
}

impl<T, S> CollectionStore<T, S>
where
    T: Clone + Send + Sync,
    S: ListSource<T>,
{
    pub fn new(source: S, schema: FilterSchema, max_limit: u32) -> Self {
        let limit = schema.default_limit().min(max_limit.max(1));
        Self {
            source,
            schema,
            max_limit,
            state: RwLock::new(StoreSnapshot::initial(limit)),
            generation: AtomicU64::new(0),
            last_request: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    pub async fn snapshot(&self) -> StoreSnapshot<T> {
        self.state.read().await.clone()
    }

    /// Слияние патча с текущими фильтрами и проверка лимита, без сети
    pub async fn resolve(&self, request: &FetchRequest) -> ApiResult<ListRequest> {
        let state = self.state.read().await;
        let filters = state.filters.merge(&request.filters, &self.schema);
        let page = PageState::new(
            request.page.unwrap_or(state.page),
            request.limit.unwrap_or(state.limit),
        );
        page.validate(self.max_limit)?;
        Ok(ListRequest::new(page, filters))
    }

    pub async fn fetch(&self, request: FetchRequest) -> ApiResult<FetchOutcome> {
        let list_request = match self.resolve(&request).await {
            Ok(list_request) => list_request,
            Err(err) => {
                log::debug!("Rejected {} fetch before network: {}", self.schema.resource(), err);
                return Err(err);
            }
        };
        self.execute(list_request).await
    }

    /// Повтор последнего разрешённого запроса (кнопка "Повторить")
    pub async fn retry(&self) -> ApiResult<FetchOutcome> {
        let last = self.last_request.read().await.clone();
        match last {
            Some(list_request) => self.execute(list_request).await,
            None => self.fetch(FetchRequest::new()).await,
        }
    }

    /// Перезагрузка текущей страницы с текущими фильтрами
    pub async fn refresh(&self) -> ApiResult<FetchOutcome> {
        self.fetch(FetchRequest::new()).await
    }

    pub async fn set_page(&self, page: u32) -> ApiResult<FetchOutcome> {
        self.fetch(FetchRequest::new().page(page)).await
    }

    /// Смена размера страницы возвращает на первую страницу
    pub async fn set_limit(&self, limit: u32) -> ApiResult<FetchOutcome> {
        self.fetch(FetchRequest::new().page(1).limit(limit)).await
    }

    pub async fn create(&self, body: Value) -> ApiResult<T> {
        let created = self.mutate(self.source.create(body).await).await?;
        self.refresh_after("create").await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, body: Value) -> ApiResult<T> {
        let updated = self.mutate(self.source.update(id, body).await).await?;
        self.refresh_after("update").await;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.mutate(self.source.delete(id).await).await?;
        self.refresh_after("delete").await;
        Ok(())
    }

    /// Сброс к начальному состоянию; запросы в полёте становятся устаревшими
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = StoreSnapshot::initial(self.schema.default_limit().min(self.max_limit.max(1)));
        *self.last_request.write().await = None;
    }

    /// Мутация уже прошла на бэкенде: ошибка перезагрузки остаётся в снимке
    async fn refresh_after(&self, action: &str) {
        if let Err(err) = self.refresh().await {
            log::warn!(
                "{} {} succeeded but reload failed: {}",
                self.schema.resource(), action, err
            );
        }
    }

    async fn mutate<R>(&self, result: ApiResult<R>) -> ApiResult<R> {
        if let Err(err) = &result {
            self.state.write().await.error = Some(err.message());
        }
        result
    }

    async fn execute(&self, list_request: ListRequest) -> ApiResult<FetchOutcome> {
        let generation = {
            let mut state = self.state.write().await;
            state.is_loading = true;
            // Под той же блокировкой: retry повторяет запрос последнего поколения
            *self.last_request.write().await = Some(list_request.clone());
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        log::debug!(
            "Fetching {} page {} (limit {}), generation {}",
            self.schema.resource(), list_request.page.page, list_request.page.limit, generation
        );

        let result = self.source.fetch_list(&list_request).await;

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!(
                "Discarding stale {} response (generation {})",
                self.schema.resource(), generation
            );
            return Ok(FetchOutcome::Superseded);
        }

        state.is_loading = false;
        match result {
            Ok(collection) => {
                state.items = collection.items;
                state.total = collection.total;
                state.page = collection.page;
                state.limit = collection.limit;
                state.filters = list_request.filters;
                state.error = None;
                Ok(FetchOutcome::Applied)
            }
            Err(err) => {
                log::warn!("Failed to load {}: {}", self.schema.resource(), err);
                // Старые элементы остаются видимыми
                state.error = Some(err.message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::listing::testing::MockSource;
    use serde_json::json;
    use std::time::Duration;

    fn store() -> CollectionStore<String, MockSource> {
        CollectionStore::new(MockSource::new(), FilterSchema::for_bookings(), 100)
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let store = store();
        let snapshot = store.snapshot().await;
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.page_state(), PageState::new(1, 20));
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn test_fetch_applies_result() {
        let store = store();
        let outcome = store.fetch(FetchRequest::new().set("status", "approved")).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Applied);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.items, vec!["p1:status=approved".to_string()]);
        assert_eq!(snapshot.total, 42);
        assert_eq!(snapshot.total_pages(), 3);
        assert_eq!(snapshot.filters.get("status"), Some(&FilterValue::text("approved")));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_empty_fetch_twice_does_not_drift() {
        let store = store();
        store.fetch(FetchRequest::new().set("status", "approved").set("search", "bmw")).await.unwrap();

        store.fetch(FetchRequest::new()).await.unwrap();
        let first = store.snapshot().await.filters;
        store.fetch(FetchRequest::new()).await.unwrap();
        let second = store.snapshot().await.filters;

        assert_eq!(first, second);
        let calls = store.source().calls();
        assert_eq!(calls[1].filters, calls[2].filters);
    }

    #[tokio::test]
    async fn test_explicit_clear_vs_omission() {
        let store = store();
        store.fetch(FetchRequest::new().set("status", "approved")).await.unwrap();

        let cleared = store.resolve(&FetchRequest::new().clear("status")).await.unwrap();
        assert!(cleared.filters.is_empty());

        let preserved = store.resolve(&FetchRequest::new().set("search", "x")).await.unwrap();
        assert_eq!(preserved.filters.get("status"), Some(&FilterValue::text("approved")));
        assert_eq!(preserved.filters.get("search"), Some(&FilterValue::text("x")));
    }

    #[tokio::test]
    async fn test_limit_cap_short_circuits() {
        let store = store();
        let err = store.fetch(FetchRequest::new().limit(500)).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
        assert!(store.source().calls().is_empty());

        // Снимок не тронут
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.error, None);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_items() {
        let store = store();
        store.fetch(FetchRequest::new()).await.unwrap();
        let before = store.snapshot().await.items;

        store.source().fail_next(ApiError::Transport("connection refused".into()));
        let err = store.fetch(FetchRequest::new().set("status", "cancelled")).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.items, before);
        assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
        // Фильтр применяется только при успехе
        assert!(!snapshot.filters.contains("status"));

        // Повтор отправляет тот же разрешённый запрос
        store.retry().await.unwrap();
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.error, None);
        assert_eq!(snapshot.filters.get("status"), Some(&FilterValue::text("cancelled")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_wins_regardless_of_completion_order() {
        let store = store();
        store.source().delay_next(Duration::from_millis(300));

        let (older, newer) = tokio::join!(
            store.fetch(FetchRequest::new().set("status", "pending")),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                store.fetch(FetchRequest::new().set("status", "approved")).await
            }
        );

        assert_eq!(older.unwrap(), FetchOutcome::Superseded);
        assert_eq!(newer.unwrap(), FetchOutcome::Applied);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.items, vec!["p1:status=approved".to_string()]);
        assert_eq!(snapshot.filters.get("status"), Some(&FilterValue::text("approved")));
        assert!(!snapshot.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_invalidates_in_flight_requests() {
        let store = store();
        store.source().delay_next(Duration::from_millis(200));

        let (outcome, _) = tokio::join!(
            store.fetch(FetchRequest::new().set("search", "audi")),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.reset().await;
            }
        );

        assert_eq!(outcome.unwrap(), FetchOutcome::Superseded);
        let snapshot = store.snapshot().await;
        assert!(snapshot.items.is_empty());
        assert!(snapshot.filters.is_empty());
    }

    #[tokio::test]
    async fn test_set_limit_resets_page() {
        let store = store();
        store.set_page(3).await.unwrap();
        assert_eq!(store.snapshot().await.page, 3);

        store.set_limit(50).await.unwrap();
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.page_state(), PageState::new(1, 50));
    }

    #[tokio::test]
    async fn test_mutations_refresh_current_page() {
        let store = store();
        store.set_page(2).await.unwrap();

        store.create(json!({"name": "Civic"})).await.unwrap();
        store.update("7", json!({"name": "Accord"})).await.unwrap();
        store.delete("7").await.unwrap();

        let mutations = store.source().mutations.lock().unwrap().clone();
        assert_eq!(mutations.len(), 3);
        assert!(mutations[2].starts_with("delete:7"));

        // set_page + три обновления после мутаций, все на странице 2
        let calls = store.source().calls();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|c| c.page.page == 2));
    }

    #[tokio::test]
    async fn test_mutation_succeeds_even_if_reload_fails() {
        let store = store();
        store.fetch(FetchRequest::new()).await.unwrap();

        store.source().fail_next(ApiError::Transport("refresh down".into()));
        let created = store.create(json!({"name": "Civic"})).await.unwrap();
        assert_eq!(created, json!({"name": "Civic"}).to_string());

        let mutations = store.source().mutations.lock().unwrap().clone();
        assert_eq!(mutations, vec![format!("create:{}", json!({"name": "Civic"}))]);

        // Ошибка перезагрузки видна в снимке, старые элементы на месте
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.error.as_deref(), Some("refresh down"));
        assert_eq!(snapshot.items.len(), 1);

        store.source().fail_next(ApiError::Transport("refresh down".into()));
        store.delete("7").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_repeats_latest_generation_request() {
        let store = store();
        store.source().delay_next(Duration::from_millis(300));

        let (older, newer) = tokio::join!(
            store.fetch(FetchRequest::new().set("status", "pending")),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                store.fetch(FetchRequest::new().set("status", "approved")).await
            }
        );
        assert_eq!(older.unwrap(), FetchOutcome::Superseded);
        assert_eq!(newer.unwrap(), FetchOutcome::Applied);

        store.retry().await.unwrap();
        let calls = store.source().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].filters.get("status"), Some(&FilterValue::text("approved")));
    }
}
