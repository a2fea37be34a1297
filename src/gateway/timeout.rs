//! 超时装饰器
//!
//! 网关调用挂起时会让 `loading` 永远为真，这里给每个调用套上
//! `tokio::time::timeout`，超时转换为 `AppError::Network("timeout")`。

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::gateway::SearchGateway;
use crate::models::{SearchQuery, SearchResponse, SearchStatistics, TireSuggestion};

/// 默认超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

pub struct TimeoutGateway<G> {
    inner: G,
    timeout: Duration,
}

impl<G: SearchGateway> TimeoutGateway<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn guard<T>(&self, operation: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Gateway call timed out");
                Err(AppError::timeout())
            }
        }
    }
}

#[async_trait]
impl<G: SearchGateway> SearchGateway for TimeoutGateway<G> {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.guard("search", self.inner.search(query)).await
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<TireSuggestion>> {
        self.guard("suggest", self.inner.suggest(prefix, limit)).await
    }

    async fn record_query(&self, query: &str, result_count: usize) -> Result<()> {
        self.guard("record_query", self.inner.record_query(query, result_count))
            .await
    }

    async fn popular_queries(&self, limit: usize) -> Result<Vec<String>> {
        self.guard("popular_queries", self.inner.popular_queries(limit))
            .await
    }

    async fn brands(&self) -> Result<Vec<String>> {
        self.guard("brands", self.inner.brands()).await
    }

    async fn models(&self, brand: &str) -> Result<Vec<String>> {
        self.guard("models", self.inner.models(brand)).await
    }

    async fn diameters(&self) -> Result<Vec<u32>> {
        self.guard("diameters", self.inner.diameters()).await
    }

    async fn statistics(&self) -> Result<SearchStatistics> {
        self.guard("statistics", self.inner.statistics()).await
    }
}
