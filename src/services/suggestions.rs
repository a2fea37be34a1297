//! 输入联想
//!
//! 联想是独立于搜索的通道：有自己的防抖定时器、序号和缓存。
//! 获取失败时降级为空列表，不写入会话的 `error`。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::gateway::{SearchGateway, TtlCache};
use crate::models::TireSuggestion;
use crate::observability::SearchMetrics;
use crate::services::debounce::{Debouncer, SequenceGuard};

const SUGGESTION_CACHE_ENTRIES: usize = 128;

pub struct SuggestionCoordinator {
    gateway: Arc<dyn SearchGateway>,
    debouncer: Debouncer,
    sequence: SequenceGuard,
    cache: TtlCache<String, Vec<TireSuggestion>>,
    min_chars: usize,
    limit: usize,
    metrics: Arc<SearchMetrics>,
}

impl SuggestionCoordinator {
    pub fn new(
        gateway: Arc<dyn SearchGateway>,
        debounce: Duration,
        cache_ttl: Duration,
        min_chars: usize,
        limit: usize,
        metrics: Arc<SearchMetrics>,
    ) -> Self {
        Self {
            gateway,
            debouncer: Debouncer::new(debounce),
            sequence: SequenceGuard::new(),
            cache: TtlCache::new(cache_ttl, SUGGESTION_CACHE_ENTRIES),
            min_chars: min_chars.max(1),
            limit: limit.max(1),
            metrics,
        }
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn sequence(&self) -> &SequenceGuard {
        &self.sequence
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 文本是否足够长，可以请求联想
    pub fn accepts(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_chars
    }

    /// 取消待触发的定时器并使在途结果失效
    pub fn invalidate(&self) {
        self.debouncer.cancel();
        self.sequence.invalidate();
    }

    /// 获取远端联想，失败时返回空列表
    pub async fn fetch(&self, text: &str) -> Vec<TireSuggestion> {
        let key = text.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        self.metrics.record_suggestion_request();
        let started = Instant::now();
        match self.gateway.suggest(text.trim(), self.limit).await {
            Ok(suggestions) => {
                debug!(
                    prefix = text,
                    count = suggestions.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Suggestions fetched"
                );
                self.cache.insert(key, suggestions.clone());
                suggestions
            }
            Err(e) => {
                debug!(prefix = text, error = %e, "Suggestion fetch failed, showing none");
                self.metrics.record_suggestion_failure();
                Vec::new()
            }
        }
    }
}

/// 合并历史与远端联想
///
/// 历史中包含 `text`（不区分大小写）的条目在前，远端结果在后，
/// 不区分大小写去重，最多 `limit` 条。
pub fn merge_suggestions(
    history: &[String],
    remote: Vec<TireSuggestion>,
    text: &str,
    limit: usize,
) -> Vec<TireSuggestion> {
    let needle = text.trim().to_lowercase();
    let mut seen = HashSet::new();

    history
        .iter()
        .filter(|h| !needle.is_empty() && h.to_lowercase().contains(&needle))
        .map(|h| TireSuggestion::history(h.clone()))
        .chain(remote)
        .filter(|s| !s.text.trim().is_empty())
        .filter(|s| seen.insert(s.text.trim().to_lowercase()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::gateway::InMemoryGateway;
    use crate::models::SuggestionSource;

    fn coordinator(gateway: Arc<InMemoryGateway>) -> SuggestionCoordinator {
        SuggestionCoordinator::new(
            gateway,
            Duration::from_millis(300),
            Duration::from_secs(300),
            2,
            5,
            Arc::new(SearchMetrics::default()),
        )
    }

    #[test]
    fn test_merge_history_first_and_dedup() {
        let history = vec![
            "BMW X5 2018".to_string(),
            "Audi A4".to_string(),
            "bmw x3".to_string(),
        ];
        let remote = vec![
            TireSuggestion::remote("BMW X3"),
            TireSuggestion::remote("BMW 3 Series"),
        ];

        let merged = merge_suggestions(&history, remote, "bmw", 10);
        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["BMW X5 2018", "bmw x3", "BMW 3 Series"]);
        assert_eq!(merged[0].source, SuggestionSource::History);
        assert_eq!(merged[2].source, SuggestionSource::Remote);
    }

    #[test]
    fn test_merge_respects_limit() {
        let remote = (0..10)
            .map(|i| TireSuggestion::remote(format!("Kia {i}")))
            .collect();
        assert_eq!(merge_suggestions(&[], remote, "kia", 3).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_is_cached_per_prefix() {
        let gateway = Arc::new(InMemoryGateway::new().with_suggestions("kia", &["Kia Rio"]));
        let coordinator = coordinator(gateway.clone());

        assert_eq!(coordinator.fetch("kia").await.len(), 1);
        assert_eq!(coordinator.fetch("KIA ").await.len(), 1);
        assert_eq!(gateway.suggest_calls().len(), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        coordinator.fetch("kia").await;
        assert_eq!(gateway.suggest_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let gateway = Arc::new(
            InMemoryGateway::new().with_suggest_error(AppError::Network("HTTP 502".into())),
        );
        let coordinator = coordinator(gateway);

        assert!(coordinator.fetch("kia").await.is_empty());
        assert_eq!(coordinator.metrics.snapshot().suggestion_failures, 1);
    }

    #[test]
    fn test_accepts_min_chars() {
        let coordinator = coordinator(Arc::new(InMemoryGateway::new()));
        assert!(!coordinator.accepts(" k "));
        assert!(coordinator.accepts("ki"));
    }
}
