// src/listing/sync.rs
//! Синхронизация URL и стора.
//!
//! Правило: если декодированное из URL состояние отличается от последнего
//! применённого - загрузить; если пользователь меняет фильтр - записать новое
//! состояние в URL. Текстовые фильтры пишутся в URL после паузы ввода.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::ApiResult;
use super::client::ListSource;
use super::codec::decode;
use super::filters::FilterSchema;
use super::store::{CollectionStore, FetchOutcome, FetchRequest};

// ==================== SYNCHRONIZER ====================

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// URL содержит невалидные параметры: заменить на исправленный, без загрузки
    Rewrite(String),
    /// Состояние изменилось: загрузить
    Fetch(FetchRequest),
    /// Ничего не изменилось
    Idle,
}

#[derive(Debug, Clone)]
pub struct UrlSynchronizer {
    schema: FilterSchema,
    last_applied: Option<String>,
}

impl UrlSynchronizer {
    pub fn new(schema: FilterSchema) -> Self {
        Self { schema, last_applied: None }
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    pub fn last_applied(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    /// Следующее изменение URL снова приведёт к загрузке
    pub fn forget(&mut self) {
        self.last_applied = None;
    }

    /// Загрузка не удалась: состояние не считается применённым, если за это
    /// время не было применено другое
    pub fn rollback(&mut self, canonical: &str) {
        if self.last_applied.as_deref() == Some(canonical) {
            self.last_applied = None;
        }
    }

    pub fn on_url_change(&mut self, query: &str) -> SyncAction {
        let decoded = decode(&self.schema, query);
        let canonical = decoded.canonical(&self.schema);

        if decoded.needs_rewrite {
            return SyncAction::Rewrite(canonical);
        }

        if self.last_applied.as_deref() == Some(canonical.as_str()) {
            return SyncAction::Idle;
        }

        let request = decoded.to_fetch_request(&self.schema);
        self.last_applied = Some(canonical);
        SyncAction::Fetch(request)
    }
}

/// Новая строка запроса после правки одного фильтра (страница сбрасывается на 1)
pub fn with_filter(schema: &FilterSchema, query: &str, name: &str, raw: &str) -> String {
    let mut decoded = decode(schema, query);
    decoded.edit(schema, name, raw);
    decoded.canonical(schema)
}

pub fn with_page(schema: &FilterSchema, query: &str, page: u32) -> String {
    let mut decoded = decode(schema, query);
    decoded.page.page = page.max(1);
    decoded.canonical(schema)
}

// ==================== DEBOUNCER ====================

/// Дебаунс на билетах: из вызовов `settle`, попавших в одно окно тишины,
/// `true` вернёт только последний.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    ticket: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    pub async fn settle(&self) -> bool {
        let mine = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.quiet).await;
        self.ticket.load(Ordering::SeqCst) == mine
    }

    /// Отменяет ожидающий вызов (например, при немедленной правке другого фильтра)
    pub fn cancel(&self) {
        self.ticket.fetch_add(1, Ordering::SeqCst);
    }
}

// ==================== LIST VIEW ====================

/// Связка "адресная строка + синхронизатор + стор" для одного экрана списка
pub struct ListView<T, S> {
    store: Arc<CollectionStore<T, S>>,
    sync: Mutex<UrlSynchronizer>,
    location: Mutex<String>,
    debouncer: Debouncer,
}

impl<T, S> ListView<T, S>
where
    T: Clone + Send + Sync,
    S: ListSource<T>,
{
    pub fn new(store: Arc<CollectionStore<T, S>>, debounce: Duration) -> Self {
        let schema = store.schema().clone();
        Self {
            store,
            sync: Mutex::new(UrlSynchronizer::new(schema)),
            location: Mutex::new(String::new()),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn store(&self) -> &Arc<CollectionStore<T, S>> {
        &self.store
    }

    /// Текущая строка запроса "адресной строки"
    pub async fn location(&self) -> String {
        self.location.lock().await.clone()
    }

    /// Переход по URL. Исправление URL перезапускает синхронизатор ровно один раз.
    pub async fn navigate(&self, query: &str) -> ApiResult<Option<FetchOutcome>> {
        let mut query = query.trim_start_matches('?').to_string();

        for _ in 0..2 {
            *self.location.lock().await = query.clone();
            let (action, pending) = {
                let mut sync = self.sync.lock().await;
                let action = sync.on_url_change(&query);
                (action, sync.last_applied().map(str::to_string))
            };

            match action {
                SyncAction::Rewrite(corrected) => {
                    log::debug!("Rewriting URL '{}' -> '{}'", query, corrected);
                    query = corrected;
                }
                SyncAction::Fetch(request) => {
                    let result = self.store.fetch(request).await;
                    if result.is_err() {
                        if let Some(canonical) = pending {
                            self.sync.lock().await.rollback(&canonical);
                        }
                    }
                    return result.map(Some);
                }
                SyncAction::Idle => return Ok(None),
            }
        }

        Ok(None)
    }

    /// Select/boolean/дата: применяется сразу
    pub async fn select(&self, name: &str, value: &str) -> ApiResult<Option<FetchOutcome>> {
        self.debouncer.cancel();
        let next = self.edited(name, value).await;
        self.navigate(&next).await
    }

    /// Текстовый фильтр: применяется после паузы ввода, только последнее значение
    pub async fn type_text(&self, name: &str, value: &str) -> ApiResult<Option<FetchOutcome>> {
        if !self.debouncer.settle().await {
            return Ok(None);
        }
        let next = self.edited(name, value).await;
        self.navigate(&next).await
    }

    pub async fn go_to_page(&self, page: u32) -> ApiResult<Option<FetchOutcome>> {
        let schema = self.store.schema();
        let next = with_page(schema, &self.location().await, page);
        self.navigate(&next).await
    }

    pub async fn retry(&self) -> ApiResult<FetchOutcome> {
        self.store.retry().await
    }

    /// Уход со страницы: стор и синхронизатор возвращаются в исходное состояние
    pub async fn leave(&self) {
        self.debouncer.cancel();
        self.sync.lock().await.forget();
        self.location.lock().await.clear();
        self.store.reset().await;
    }

    async fn edited(&self, name: &str, value: &str) -> String {
        let location = self.location().await;
        with_filter(self.store.schema(), &location, name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::listing::filters::FilterValue;
    use crate::listing::testing::MockSource;
    use crate::listing::PageState;

    fn view(schema: FilterSchema) -> Arc<ListView<String, MockSource>> {
        let store = Arc::new(CollectionStore::new(MockSource::new(), schema, 100));
        let debounce = crate::config::ListingConfig::default().search_debounce();
        Arc::new(ListView::new(store, debounce))
    }

    #[test]
    fn test_synchronizer_fetches_only_on_real_change() {
        let mut sync = UrlSynchronizer::new(FilterSchema::for_bookings());

        assert!(matches!(sync.on_url_change("status=approved"), SyncAction::Fetch(_)));
        // То же состояние в другой записи
        assert_eq!(sync.on_url_change("?page=1&status=approved&limit=20"), SyncAction::Idle);
        assert_eq!(sync.on_url_change("status=approved&status_extra=1"), SyncAction::Idle);
        assert!(matches!(sync.on_url_change("status=cancelled"), SyncAction::Fetch(_)));

        sync.forget();
        assert!(matches!(sync.on_url_change("status=cancelled"), SyncAction::Fetch(_)));
    }

    #[test]
    fn test_synchronizer_rewrites_invalid_ids_without_fetching() {
        let mut sync = UrlSynchronizer::new(FilterSchema::for_user_workflows());

        let action = sync.on_url_change("workflowId=12a3");
        assert_eq!(action, SyncAction::Rewrite("page=1&limit=10&workflowId=123".to_string()));
        assert_eq!(sync.last_applied(), None);

        match sync.on_url_change("page=1&limit=10&workflowId=123") {
            SyncAction::Fetch(request) => {
                assert_eq!(request.filters.entry("workflowId"), Some(Some(&FilterValue::text("123"))));
            }
            other => panic!("expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_rollback_only_forgets_matching_state() {
        let mut sync = UrlSynchronizer::new(FilterSchema::for_bookings());
        assert!(matches!(sync.on_url_change("status=approved"), SyncAction::Fetch(_)));

        sync.rollback("page=1&limit=20&status=cancelled");
        assert_eq!(sync.last_applied(), Some("page=1&limit=20&status=approved"));

        sync.rollback("page=1&limit=20&status=approved");
        assert!(matches!(sync.on_url_change("status=approved"), SyncAction::Fetch(_)));
    }

    #[test]
    fn test_query_helpers() {
        let schema = FilterSchema::for_bookings();
        assert_eq!(
            with_filter(&schema, "page=4&limit=20", "status", "approved"),
            "page=1&limit=20&status=approved"
        );
        assert_eq!(with_page(&schema, "status=approved", 3), "page=3&limit=20&status=approved");
    }

    #[tokio::test]
    async fn test_navigate_sanitizes_then_fetches_once() {
        let view = view(FilterSchema::for_user_workflows());

        let outcome = view.navigate("?workflowId=12a3").await.unwrap();
        assert_eq!(outcome, Some(FetchOutcome::Applied));
        assert_eq!(view.location().await, "page=1&limit=10&workflowId=123");

        let calls = view.store().source().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filters.get("workflowId"), Some(&FilterValue::text("123")));

        // Повторный переход на тот же URL ничего не грузит
        assert_eq!(view.navigate("page=1&limit=10&workflowId=123").await.unwrap(), None);
        assert_eq!(view.store().source().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_search_fetches_once_after_quiet_period() {
        let view = view(FilterSchema::for_bookings());
        view.navigate("page=2&limit=20").await.unwrap();
        assert_eq!(view.store().source().calls().len(), 1);

        let mut handles = Vec::new();
        for prefix in ["t", "te", "tes", "tesl", "tesla"] {
            let view = view.clone();
            handles.push(tokio::spawn(async move { view.type_text("search", prefix).await }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        let calls = view.store().source().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].page, PageState::new(1, 20));
        assert_eq!(calls[1].filters.get("search"), Some(&FilterValue::text("tesla")));
        assert_eq!(calls[1].filters.len(), 1);
        assert_eq!(view.location().await, "page=1&limit=20&search=tesla");
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_applies_immediately_and_cancels_pending_text() {
        let view = view(FilterSchema::for_bookings());
        view.navigate("").await.unwrap();

        let typing = {
            let view = view.clone();
            tokio::spawn(async move { view.type_text("search", "bmw").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = view.select("status", "approved").await.unwrap();
        assert_eq!(outcome, Some(FetchOutcome::Applied));
        assert_eq!(typing.await.unwrap().unwrap(), None);

        let calls = view.store().source().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].filters.get("status"), Some(&FilterValue::text("approved")));
        assert!(!calls[1].filters.contains("search"));
    }

    #[tokio::test]
    async fn test_select_all_clears_filter() {
        let view = view(FilterSchema::for_bookings());
        view.navigate("status=approved").await.unwrap();
        view.select("status", crate::listing::ALL).await.unwrap();

        let snapshot = view.store().snapshot().await;
        assert!(snapshot.filters.is_empty());
        assert_eq!(view.location().await, "page=1&limit=20");
    }

    #[tokio::test]
    async fn test_oversized_limit_in_url_is_rejected_locally() {
        let view = view(FilterSchema::for_bookings());
        let err = view.navigate("limit=500").await.unwrap_err();
        assert!(err.is_validation());
        assert!(view.store().source().calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_navigation_is_retried_on_same_url() {
        let view = view(FilterSchema::for_bookings());
        view.store().source().fail_next(ApiError::Transport("down".into()));

        let err = view.navigate("status=approved").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));

        let outcome = view.navigate("status=approved").await.unwrap();
        assert_eq!(outcome, Some(FetchOutcome::Applied));
        assert_eq!(view.store().source().calls().len(), 2);
        let snapshot = view.store().snapshot().await;
        assert_eq!(snapshot.filters.get("status"), Some(&FilterValue::text("approved")));
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn test_rejected_limit_keeps_failing_on_same_url() {
        let view = view(FilterSchema::for_bookings());
        assert!(view.navigate("limit=500").await.unwrap_err().is_validation());
        assert!(view.navigate("limit=500").await.unwrap_err().is_validation());
        assert!(view.store().source().calls().is_empty());
    }

    #[tokio::test]
    async fn test_leave_resets_everything() {
        let view = view(FilterSchema::for_bookings());
        view.navigate("status=approved&page=2").await.unwrap();
        view.leave().await;

        assert_eq!(view.location().await, "");
        assert!(view.store().snapshot().await.items.is_empty());

        // После возврата тот же URL снова грузится
        assert!(view.navigate("status=approved&page=2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_go_to_page_keeps_filters() {
        let view = view(FilterSchema::for_bookings());
        view.navigate("status=approved").await.unwrap();
        view.go_to_page(3).await.unwrap();

        let snapshot = view.store().snapshot().await;
        assert_eq!(snapshot.page, 3);
        assert_eq!(snapshot.filters.get("status"), Some(&FilterValue::text("approved")));
    }
}
