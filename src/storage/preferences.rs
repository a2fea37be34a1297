//! 类型化的偏好存储
//!
//! 所有持久化都是尽力而为：失败只记录 `warn!` 日志，读取回退到默认值，
//! 写入失败不影响内存状态。

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

use crate::models::SearchFilters;
use crate::observability::SearchMetrics;
use crate::storage::store::{PersistenceStore, StorageKey};

/// 默认历史上限
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PersistenceStore>,
    history_limit: usize,
    metrics: Option<Arc<SearchMetrics>>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PersistenceStore>, history_limit: usize) -> Self {
        Self {
            store,
            history_limit: history_limit.max(1),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    fn load<T: DeserializeOwned + Default>(&self, key: StorageKey) -> T {
        let value = match self.store.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read preference, using default");
                self.record_failure();
                return T::default();
            }
        };

        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Stored preference has unexpected shape, using default");
            self.record_failure();
            T::default()
        })
    }

    fn save<T: Serialize>(&self, key: StorageKey, value: &T) {
        let result = serde_json::to_value(value)
            .map_err(crate::error::AppError::from)
            .and_then(|json| self.store.save(key, &json));

        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to persist preference");
            self.record_failure();
        }
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_storage_failure();
        }
    }

    pub fn load_history(&self) -> Vec<String> {
        let mut history: Vec<String> = self.load(StorageKey::SearchHistory);
        history.retain(|h| !h.trim().is_empty());
        history.truncate(self.history_limit);
        history
    }

    pub fn save_history(&self, history: &[String]) {
        self.save(StorageKey::SearchHistory, &history);
    }

    pub fn clear_history(&self) {
        if let Err(e) = self.store.remove(StorageKey::SearchHistory) {
            warn!(error = %e, "Failed to remove persisted search history");
            self.record_failure();
        }
    }

    pub fn load_favorites(&self) -> BTreeSet<i64> {
        let ids: Vec<i64> = self.load(StorageKey::Favorites);
        ids.into_iter().collect()
    }

    pub fn save_favorites(&self, favorites: &BTreeSet<i64>) {
        let ids: Vec<i64> = favorites.iter().copied().collect();
        self.save(StorageKey::Favorites, &ids);
    }

    pub fn load_recent_filters(&self) -> SearchFilters {
        self.load(StorageKey::RecentFilters)
    }

    pub fn save_recent_filters(&self, filters: &SearchFilters) {
        self.save(StorageKey::RecentFilters, filters);
    }
}

/// 把查询加入历史：去重、最近的在前、截断到 `cap`
///
/// 返回 `true` 表示历史发生了变化。
pub fn push_history(history: &mut Vec<String>, text: &str, cap: usize) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    if history.first().is_some_and(|h| h == text) {
        return false;
    }

    history.retain(|h| h != text);
    history.insert(0, text.to_string());
    history.truncate(cap);
    true
}
