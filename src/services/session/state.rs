//! 会话状态与选项

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::AppConfig;
use crate::models::{SearchFilters, SearchResultItem, TireSuggestion};
use crate::services::conversation::ConversationState;

/// 分页参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Pagination {
    /// 页码（从 1 开始）
    pub page: usize,
    /// 每页数量
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// 计算偏移量，溢出时返回 `None`
    pub fn offset(&self) -> Option<usize> {
        self.page.saturating_sub(1).checked_mul(self.page_size)
    }

    pub fn is_valid(&self) -> bool {
        self.page > 0 && self.page_size > 0
    }
}

/// 会话状态快照
///
/// `page == 0` 表示还没有加载过结果。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSessionState {
    pub query: String,
    pub filters: SearchFilters,
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub page: usize,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub suggestions: Vec<TireSuggestion>,
    pub history: Vec<String>,
    pub favorites: BTreeSet<i64>,
    /// 搜索响应附带的提示
    pub hints: Vec<String>,
    /// 服务端消息（对话模式下的说明文字）
    pub message: Option<String>,
    pub conversation: ConversationState,
}

impl SearchSessionState {
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.loading
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn clear_results(&mut self) {
        self.results.clear();
        self.total = 0;
        self.page = 0;
        self.has_more = false;
    }
}

/// 会话选项
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub page_size: usize,
    pub debounce: Duration,
    pub min_suggest_chars: usize,
    pub suggestion_limit: usize,
    pub suggestions_ttl: Duration,
    pub history_limit: usize,
    pub max_query_chars: usize,
    pub auto_search: bool,
    pub use_assisted_parsing: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        let search = &config.search;
        Self {
            page_size: search.page_size.max(1),
            debounce: Duration::from_millis(search.debounce_ms),
            min_suggest_chars: search.min_suggest_chars,
            suggestion_limit: search.suggestion_limit,
            suggestions_ttl: Duration::from_secs(config.cache.suggestions_ttl),
            history_limit: search.history_limit,
            max_query_chars: search.max_query_chars,
            auto_search: search.auto_search,
            use_assisted_parsing: search.use_assisted_parsing,
        }
    }
}
