//! 搜索会话
//!
//! 持有一次用户会话的全部状态：查询、过滤条件、结果分页、联想、历史、收藏
//! 以及追问对话。网关错误不会抛给调用方，而是写入 `error` 字段。
//!
//! 搜索和联想是两个独立通道，各自用 [`SequenceGuard`] 丢弃过期响应。
//! 状态锁只在同步代码中持有，不跨越 `.await`。

pub mod state;

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::Result;
use crate::gateway::{SearchGateway, create_gateway};
use crate::models::{SearchFilters, SearchQuery, SearchResponse};
use crate::observability::SearchMetrics;
use crate::services::debounce::SequenceGuard;
use crate::services::suggestions::{SuggestionCoordinator, merge_suggestions};
use crate::storage::{PersistenceStore, Preferences, StorageFactory, push_history};
use crate::validation::{QueryValidator, ValidationResult};

pub use state::{Pagination, SearchSessionState, SessionOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    /// 新搜索，替换结果
    Fresh,
    /// 加载更多，追加结果
    Append,
    /// 跳转到指定页，替换结果
    Page(usize),
}

struct Shared {
    state: SearchSessionState,
    /// 最近一次提交的查询，分页基于它
    active: Option<SearchQuery>,
    recent_filters: SearchFilters,
}

/// 响应应用后、释放锁之后才执行的副作用
#[derive(Default)]
struct Effects {
    history: Option<Vec<String>>,
    record: Option<(String, usize)>,
}

struct SessionInner {
    id: String,
    gateway: Arc<dyn SearchGateway>,
    preferences: Preferences,
    options: SessionOptions,
    validator: QueryValidator,
    shared: Mutex<Shared>,
    search_sequence: SequenceGuard,
    in_flight: AtomicUsize,
    suggestions: SuggestionCoordinator,
    metrics: Arc<SearchMetrics>,
}

/// 在途请求计数
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 搜索会话句柄，克隆开销很小，所有克隆共享同一状态
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    /// 创建会话并从持久化存储恢复历史和收藏
    pub fn new(
        gateway: Arc<dyn SearchGateway>,
        store: Arc<dyn PersistenceStore>,
        options: SessionOptions,
    ) -> Self {
        let metrics = Arc::new(SearchMetrics::default());
        let preferences =
            Preferences::new(store, options.history_limit).with_metrics(metrics.clone());

        let state = SearchSessionState {
            history: preferences.load_history(),
            favorites: preferences.load_favorites(),
            ..Default::default()
        };
        let recent_filters = preferences.load_recent_filters();

        let suggestions = SuggestionCoordinator::new(
            gateway.clone(),
            options.debounce,
            options.suggestions_ttl,
            options.min_suggest_chars,
            options.suggestion_limit,
            metrics.clone(),
        );

        let id = Uuid::new_v4().to_string();
        info!(
            session_id = %id,
            history = state.history.len(),
            favorites = state.favorites.len(),
            "Search session created"
        );

        Self {
            inner: Arc::new(SessionInner {
                id,
                gateway,
                preferences,
                validator: QueryValidator::new(1, options.max_query_chars),
                options,
                shared: Mutex::new(Shared {
                    state,
                    active: None,
                    recent_filters,
                }),
                search_sequence: SequenceGuard::new(),
                in_flight: AtomicUsize::new(0),
                suggestions,
                metrics,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    pub fn metrics(&self) -> Arc<SearchMetrics> {
        self.inner.metrics.clone()
    }

    /// 当前状态的快照
    pub fn snapshot(&self) -> SearchSessionState {
        self.inner.shared.lock().state.clone()
    }

    // ===== 投影 =====

    pub fn is_loading(&self) -> bool {
        self.inner.shared.lock().state.loading || self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn has_results(&self) -> bool {
        self.inner.shared.lock().state.has_results()
    }

    pub fn can_load_more(&self) -> bool {
        self.inner.shared.lock().state.can_load_more()
    }

    pub fn has_error(&self) -> bool {
        self.inner.shared.lock().state.has_error()
    }

    pub fn is_favorite(&self, id: i64) -> bool {
        self.inner.shared.lock().state.favorites.contains(&id)
    }

    /// 上次通过 `search_with_filters` 保存的过滤条件
    pub fn recent_filters(&self) -> SearchFilters {
        self.inner.shared.lock().recent_filters.clone()
    }

    /// 校验查询文本，返回去掉首尾空白后的文本
    pub fn validate(&self, text: &str) -> ValidationResult<String> {
        self.inner.validator.validate_query(text)
    }

    // ===== 输入与联想 =====

    /// 更新输入框文本并重置防抖定时器
    ///
    /// 本身不发起搜索；定时器触发后获取联想，开启 `auto_search` 时同时搜索。
    /// 需要在 tokio 运行时中调用。
    pub fn set_query(&self, text: &str) {
        self.inner.shared.lock().state.query = text.to_string();

        let ticket = self.inner.suggestions.sequence().issue();
        let session: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let text = text.to_string();
        debug!(session_id = %self.inner.id, ticket, "Suggestion debounce scheduled");

        self.inner.suggestions.debouncer().schedule(async move {
            if let Some(inner) = session.upgrade() {
                SearchSession { inner }.on_debounced(ticket, text).await;
            }
        });
    }

    async fn on_debounced(&self, ticket: u64, text: String) {
        let coordinator = &self.inner.suggestions;
        if !coordinator.sequence().is_current(ticket) {
            return;
        }

        if !coordinator.accepts(&text) {
            self.inner.shared.lock().state.suggestions.clear();
            return;
        }

        if self.inner.options.auto_search {
            let session = self.clone();
            let query = text.clone();
            tokio::spawn(async move {
                session.search(&query, None).await;
            });
        }

        let remote = coordinator.fetch(&text).await;

        let mut shared = self.inner.shared.lock();
        if !coordinator.sequence().is_current(ticket) || shared.state.query.trim() != text.trim() {
            debug!(session_id = %self.inner.id, ticket, "Stale suggestions dropped");
            self.inner.metrics.record_stale_response();
            return;
        }
        let merged = merge_suggestions(&shared.state.history, remote, &text, coordinator.limit());
        shared.state.suggestions = merged;
    }

    // ===== 搜索 =====

    /// 执行新搜索
    ///
    /// 查询为空或过长时直接返回 `None`，不发请求也不改状态。
    /// 失败或被更新的请求取代时同样返回 `None`。
    pub async fn search(&self, text: &str, filters: Option<SearchFilters>) -> Option<SearchResponse> {
        let text = match self.validate(text) {
            Ok(text) => text,
            Err(e) => {
                debug!(session_id = %self.inner.id, error = %e, "Search rejected");
                return None;
            }
        };

        let (query, ticket) = {
            let mut shared = self.inner.shared.lock();
            if let Some(filters) = filters {
                shared.state.filters.merge(filters);
            }
            let query = SearchQuery::new(text.clone(), self.inner.options.page_size)
                .with_filters(&shared.state.filters)
                .with_assisted_parsing(self.inner.options.use_assisted_parsing);

            shared.state.query = text;
            shared.state.loading = true;
            shared.active = Some(query.clone());
            (query, self.inner.search_sequence.issue())
        };

        self.execute(query, ticket, RequestKind::Fresh).await
    }

    /// 合并过滤条件、保存为最近使用，并用当前查询重新搜索
    pub async fn search_with_filters(&self, filters: SearchFilters) -> Option<SearchResponse> {
        let (merged, text) = {
            let mut shared = self.inner.shared.lock();
            shared.state.filters.merge(filters);
            let merged = shared.state.filters.clone();
            shared.recent_filters = merged.clone();
            (merged, shared.state.query.clone())
        };
        self.inner.preferences.save_recent_filters(&merged);

        if text.trim().is_empty() {
            return None;
        }
        self.search(&text, None).await
    }

    pub fn clear_filters(&self) {
        self.inner.shared.lock().state.filters = SearchFilters::default();
    }

    /// 加载下一页并追加到结果
    ///
    /// 没有更多结果或已有请求在途时不做任何事。
    pub async fn load_more(&self) -> Option<SearchResponse> {
        let (query, ticket) = {
            let mut shared = self.inner.shared.lock();
            if !shared.state.can_load_more() {
                debug!(session_id = %self.inner.id, "Load more ignored");
                return None;
            }
            let query = shared.active.as_ref()?.page_at(shared.state.results.len());
            shared.state.loading = true;
            (query, self.inner.search_sequence.issue())
        };

        self.execute(query, ticket, RequestKind::Append).await
    }

    /// 跳转到第 `page` 页（从 1 开始），替换当前结果
    pub async fn go_to_page(&self, page: usize) -> Option<SearchResponse> {
        if let Err(e) = self.inner.validator.validate_page(page) {
            debug!(session_id = %self.inner.id, error = %e, "Page change rejected");
            return None;
        }

        let (query, ticket) = {
            let mut shared = self.inner.shared.lock();
            if shared.state.loading {
                return None;
            }
            let active = shared.active.as_ref()?;
            let Some(offset) = Pagination::new(page, active.limit()).offset() else {
                debug!(session_id = %self.inner.id, page, "Page offset out of range");
                return None;
            };
            let query = active.page_at(offset);
            shared.state.loading = true;
            (query, self.inner.search_sequence.issue())
        };

        self.execute(query, ticket, RequestKind::Page(page)).await
    }

    async fn execute(
        &self,
        query: SearchQuery,
        ticket: u64,
        kind: RequestKind,
    ) -> Option<SearchResponse> {
        let inner = &self.inner;
        debug!(
            session_id = %inner.id,
            ticket,
            offset = query.offset(),
            ?kind,
            "Search request issued"
        );

        let started = Instant::now();
        let result = {
            let _in_flight = InFlight::enter(&inner.in_flight);
            inner.gateway.search(&query).await
        };
        inner
            .metrics
            .record_search(started.elapsed().as_millis() as u64);

        let mut shared = inner.shared.lock();
        if !inner.search_sequence.is_current(ticket) {
            debug!(session_id = %inner.id, ticket, "Stale search response dropped");
            inner.metrics.record_stale_response();
            return None;
        }
        let state = &mut shared.state;
        state.loading = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id = %inner.id, error = %e, ?kind, "Search failed");
                inner.metrics.record_search_failure();
                state.error = Some(e.user_message());
                if kind == RequestKind::Fresh {
                    state.clear_results();
                }
                return None;
            }
        };

        let effects = match kind {
            RequestKind::Fresh => {
                apply_fresh(state, &response, query.text(), inner.preferences.history_limit())
            }
            RequestKind::Append => {
                let added = apply_append(state, &response);
                inner.metrics.record_page_loaded();
                debug!(session_id = %inner.id, added, page = state.page, "Page appended");
                Effects::default()
            }
            RequestKind::Page(page) => {
                apply_page(state, &response, page);
                inner.metrics.record_page_loaded();
                Effects::default()
            }
        };

        info!(
            session_id = %inner.id,
            query = query.text(),
            results = state.results.len(),
            total = state.total,
            conversation = state.conversation.active,
            "Search results applied"
        );
        drop(shared);

        self.run_effects(effects);
        Some(response)
    }

    fn run_effects(&self, effects: Effects) {
        if let Some(history) = effects.history {
            self.inner.preferences.save_history(&history);
        }

        if let Some((text, result_count)) = effects.record {
            let gateway = self.inner.gateway.clone();
            tokio::spawn(async move {
                if let Err(e) = gateway.record_query(&text, result_count).await {
                    debug!(error = %e, "Failed to record query");
                }
            });
        }
    }

    /// 清空查询和结果，丢弃在途响应；历史和收藏保留
    pub fn clear_search(&self) {
        let mut shared = self.inner.shared.lock();
        self.inner.search_sequence.invalidate();
        self.inner.suggestions.invalidate();

        let state = &mut shared.state;
        state.query.clear();
        state.clear_results();
        state.loading = false;
        state.error = None;
        state.suggestions.clear();
        state.hints.clear();
        state.message = None;
        state.conversation.reset();
        shared.active = None;
        debug!(session_id = %self.inner.id, "Search cleared");
    }

    // ===== 收藏与历史 =====

    /// 切换收藏状态并立即持久化，返回切换后是否已收藏
    pub fn toggle_favorite(&self, id: i64) -> bool {
        let (favorite, favorites) = {
            let mut shared = self.inner.shared.lock();
            let favorites = &mut shared.state.favorites;
            let favorite = if favorites.remove(&id) {
                false
            } else {
                favorites.insert(id);
                true
            };
            (favorite, favorites.clone())
        };
        self.inner.preferences.save_favorites(&favorites);
        favorite
    }

    pub fn clear_history(&self) {
        self.inner.shared.lock().state.history.clear();
        self.inner.preferences.clear_history();
    }

    /// 删除一条历史，返回是否存在
    pub fn remove_history_entry(&self, text: &str) -> bool {
        let history = {
            let mut shared = self.inner.shared.lock();
            let before = shared.state.history.len();
            shared.state.history.retain(|h| h != text.trim());
            if shared.state.history.len() == before {
                return false;
            }
            shared.state.history.clone()
        };
        self.inner.preferences.save_history(&history);
        true
    }

    // ===== 追问 =====

    /// 记录追问回答，把拼好的查询写入 `query` 并返回
    ///
    /// 不会自动提交；没有活跃对话时返回 `None`。
    pub fn record_answer(&self, field: &str, value: &str) -> Option<String> {
        let mut shared = self.inner.shared.lock();
        let refined = shared.state.conversation.record_answer(field, value)?;
        shared.state.query = refined.clone();
        debug!(session_id = %self.inner.id, field, refined = %refined, "Follow-up answer recorded");
        Some(refined)
    }
}

fn apply_fresh(
    state: &mut SearchSessionState,
    response: &SearchResponse,
    text: &str,
    history_limit: usize,
) -> Effects {
    state.results = response.items.clone();
    state.total = response.total.max(response.items.len());
    state.has_more = response.has_more;
    state.page = 1;
    state.error = None;
    state.hints = response.suggestions.clone();

    match &response.conversation {
        Some(payload) if payload.active => {
            state.message = Some(payload.message.clone()).filter(|m| !m.trim().is_empty());
            state
                .conversation
                .activate(payload, response.vehicle.as_ref(), &state.filters);
        }
        _ => {
            state.message = None;
            state.conversation.reset();
        }
    }

    let history = push_history(&mut state.history, text, history_limit)
        .then(|| state.history.clone());
    let record = (!response.items.is_empty()).then(|| (text.to_string(), response.items.len()));
    Effects { history, record }
}

/// 追加一页，跳过已有的 id，返回新增条数
fn apply_append(state: &mut SearchSessionState, response: &SearchResponse) -> usize {
    let mut known: HashSet<i64> = state.results.iter().map(|item| item.id).collect();
    let before = state.results.len();
    state.results.extend(
        response
            .items
            .iter()
            .filter(|item| known.insert(item.id))
            .cloned(),
    );

    state.total = response.total.max(state.results.len());
    state.has_more = response.has_more && !response.items.is_empty();
    state.page += 1;
    state.error = None;
    state.results.len() - before
}

fn apply_page(state: &mut SearchSessionState, response: &SearchResponse, page: usize) {
    state.results = response.items.clone();
    state.total = response.total.max(response.items.len());
    state.has_more = response.has_more;
    state.page = page;
    state.error = None;
}

/// 按配置创建会话：HTTP 网关 + 配置的持久化后端
pub fn create_search_session(config: &AppConfig) -> Result<SearchSession> {
    let gateway = create_gateway(config)?;
    let store = StorageFactory::create_or_memory(&config.storage);
    Ok(SearchSession::new(gateway, store, SessionOptions::from(config)))
}
