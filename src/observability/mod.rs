//! 可观测性模块
//!
//! 提供搜索会话的计数指标和结构化日志初始化。

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

// ===== Simple Metrics =====

/// 搜索会话指标
#[derive(Debug, Default)]
pub struct SearchMetrics {
    searches_total: AtomicU64,
    search_failures: AtomicU64,
    search_latency_sum_ms: AtomicU64,
    stale_responses_dropped: AtomicU64,
    pages_loaded: AtomicU64,
    suggestion_requests: AtomicU64,
    suggestion_failures: AtomicU64,
    storage_failures: AtomicU64,
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub searches_total: u64,
    pub search_failures: u64,
    pub search_latency_sum_ms: u64,
    pub stale_responses_dropped: u64,
    pub pages_loaded: u64,
    pub suggestion_requests: u64,
    pub suggestion_failures: u64,
    pub storage_failures: u64,
}

impl SearchMetrics {
    /// 记录一次已发出的搜索请求
    pub fn record_search(&self, duration_ms: u64) {
        self.searches_total.fetch_add(1, Ordering::SeqCst);
        self.search_latency_sum_ms
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    pub fn record_search_failure(&self) {
        self.search_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录被丢弃的过期响应
    pub fn record_stale_response(&self) {
        self.stale_responses_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_page_loaded(&self) {
        self.pages_loaded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_suggestion_request(&self) {
        self.suggestion_requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_suggestion_failure(&self) {
        self.suggestion_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searches_total: self.searches_total.load(Ordering::SeqCst),
            search_failures: self.search_failures.load(Ordering::SeqCst),
            search_latency_sum_ms: self.search_latency_sum_ms.load(Ordering::SeqCst),
            stale_responses_dropped: self.stale_responses_dropped.load(Ordering::SeqCst),
            pages_loaded: self.pages_loaded.load(Ordering::SeqCst),
            suggestion_requests: self.suggestion_requests.load(Ordering::SeqCst),
            suggestion_failures: self.suggestion_failures.load(Ordering::SeqCst),
            storage_failures: self.storage_failures.load(Ordering::SeqCst),
        }
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP tire_search_requests_total Search requests issued
# TYPE tire_search_requests_total counter
tire_search_requests_total {}
# HELP tire_search_failures_total Search requests that failed
# TYPE tire_search_failures_total counter
tire_search_failures_total {}
# HELP tire_search_latency_seconds Search request latency in seconds
# TYPE tire_search_latency_seconds summary
tire_search_latency_seconds_sum {}
tire_search_latency_seconds_count {}
# HELP tire_search_stale_responses_total Responses dropped because a newer request was issued
# TYPE tire_search_stale_responses_total counter
tire_search_stale_responses_total {}
# HELP tire_search_pages_loaded_total Additional pages loaded
# TYPE tire_search_pages_loaded_total counter
tire_search_pages_loaded_total {}
# HELP tire_search_suggestion_requests_total Suggestion fetches issued
# TYPE tire_search_suggestion_requests_total counter
tire_search_suggestion_requests_total {}
# HELP tire_search_suggestion_failures_total Suggestion fetches that failed
# TYPE tire_search_suggestion_failures_total counter
tire_search_suggestion_failures_total {}
# HELP tire_search_storage_failures_total Preference reads or writes that failed
# TYPE tire_search_storage_failures_total counter
tire_search_storage_failures_total {}
"#,
            s.searches_total,
            s.search_failures,
            s.search_latency_sum_ms as f64 / 1000.0,
            s.searches_total,
            s.stale_responses_dropped,
            s.pages_loaded,
            s.suggestion_requests,
            s.suggestion_failures,
            s.storage_failures,
        )
    }
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外按天滚动写入文件，
/// 返回的 guard 必须在程序退出前保持存活。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tire_search={}", config.level, config.level)));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "tire-search.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = if config.structured {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!("tracing subscriber already set: {}", e);
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather() {
        let metrics = SearchMetrics::default();
        metrics.record_search(120);
        metrics.record_search(80);
        metrics.record_stale_response();
        metrics.record_suggestion_request();
        metrics.record_storage_failure();

        let output = metrics.gather();
        assert!(output.contains("tire_search_requests_total 2"));
        assert!(output.contains("tire_search_latency_seconds_sum 0.2"));
        assert!(output.contains("tire_search_stale_responses_total 1"));
        assert!(output.contains("tire_search_storage_failures_total 1"));
    }

    #[test]
    fn test_snapshot() {
        let metrics = SearchMetrics::default();
        metrics.record_search_failure();
        metrics.record_page_loaded();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.search_failures, 1);
        assert_eq!(snapshot.pages_loaded, 1);
        assert_eq!(snapshot.searches_total, 0);
    }
}
