// src/listing/mod.rs
//! Синхронизация постраничных списков: URL <-> стор <-> удалённый эндпоинт

pub mod filters;
pub mod codec;
pub mod client;
pub mod store;
pub mod sync;
pub mod tree;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub use filters::{FilterKind, FilterPatch, FilterSchema, FilterSet, FilterValue};
pub use codec::{decode, encode, ControlState, DecodedQuery, ALL};
pub use client::{HttpListClient, ListSource};
pub use store::{CollectionStore, FetchOutcome, FetchRequest, StoreSnapshot};
pub use sync::{Debouncer, ListView, SyncAction, UrlSynchronizer};
pub use tree::{DocumentTree, NodeId, TreeRow};

// ==================== PAGE STATE ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageState {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PageState {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn first(limit: u32) -> Self {
        Self { page: 1, limit }
    }

    /// Лимит ограничен сервером; проверяем до сетевого вызова
    pub fn validate(&self, max_limit: u32) -> ApiResult<()> {
        if self.page == 0 {
            return Err(ApiError::ValidationError("page must be at least 1".to_string()));
        }
        if self.limit == 0 {
            return Err(ApiError::ValidationError("limit must be at least 1".to_string()));
        }
        if self.limit > max_limit {
            return Err(ApiError::limit_exceeded(self.limit, max_limit));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }
}

// ==================== LIST REQUEST ====================

/// Полностью разрешённый запрос списка: то, что реально уходит в сеть
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub page: PageState,
    pub filters: FilterSet,
}

impl ListRequest {
    pub fn new(page: PageState, filters: FilterSet) -> Self {
        Self { page, filters }
    }
}
