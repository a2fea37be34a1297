//! 搜索网关模块
//!
//! 封装远端搜索 API。所有操作都返回 `Result`，响应结构在这里统一规范化，
//! 上层只看到 [`SearchResponse`]。

pub mod cache;
pub mod http;
pub mod lookup;
pub mod memory;
pub mod timeout;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{SearchQuery, SearchResponse, SearchStatistics, TireSuggestion};

pub use cache::TtlCache;
pub use http::HttpSearchGateway;
pub use lookup::LookupService;
pub use memory::{GatewayCall, InMemoryGateway};
pub use timeout::TimeoutGateway;

/// 搜索网关 trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// 执行搜索
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    /// 输入联想
    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<TireSuggestion>>;

    /// 记录查询（统计用途）
    async fn record_query(&self, query: &str, result_count: usize) -> Result<()>;

    /// 热门查询
    async fn popular_queries(&self, limit: usize) -> Result<Vec<String>>;

    /// 品牌列表
    async fn brands(&self) -> Result<Vec<String>>;

    /// 指定品牌的车型列表
    async fn models(&self, brand: &str) -> Result<Vec<String>>;

    /// 轮毂直径列表
    async fn diameters(&self) -> Result<Vec<u32>>;

    /// 搜索统计
    async fn statistics(&self) -> Result<SearchStatistics>;
}

/// 根据配置创建带超时保护的 HTTP 网关
pub fn create_gateway(config: &AppConfig) -> Result<Arc<dyn SearchGateway>> {
    let http = HttpSearchGateway::new(&config.gateway)?;
    Ok(Arc::new(TimeoutGateway::new(http, config.gateway.timeout())))
}
