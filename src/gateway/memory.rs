//! 内存网关
//!
//! 按查询文本返回预置结果，可配置延迟和失败。用于测试和离线演示。

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::gateway::SearchGateway;
use crate::models::{
    SearchQuery, SearchResponse, SearchResultItem, SearchStatistics, TireSuggestion,
};

/// 网关调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Search(SearchQuery),
    Suggest(String),
    RecordQuery { query: String, result_count: usize },
    Popular,
    Brands,
    Models(String),
    Diameters,
    Statistics,
}

#[derive(Clone)]
enum Scripted {
    /// 按 offset/limit 分页的结果目录
    Catalogue(Vec<SearchResultItem>),
    /// 固定响应
    Fixed(SearchResponse),
    Fail(AppError),
}

#[derive(Default)]
struct Script {
    searches: HashMap<String, Scripted>,
    search_delays: HashMap<String, Duration>,
    suggestions: HashMap<String, Vec<String>>,
    suggest_delays: HashMap<String, Duration>,
    suggest_error: Option<AppError>,
    /// 覆盖所有搜索的失败
    search_error: Option<AppError>,
    lookup_error: Option<AppError>,
    brands: Vec<String>,
    models: HashMap<String, Vec<String>>,
    diameters: Vec<u32>,
    popular: Vec<String>,
    statistics: SearchStatistics,
}

#[derive(Default)]
pub struct InMemoryGateway {
    script: Mutex<Script>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为查询文本预置可分页的结果
    pub fn with_catalogue(self, text: &str, items: Vec<SearchResultItem>) -> Self {
        self.script
            .lock()
            .searches
            .insert(text.to_string(), Scripted::Catalogue(items));
        self
    }

    /// 为查询文本预置固定响应
    pub fn with_response(self, text: &str, response: SearchResponse) -> Self {
        self.script
            .lock()
            .searches
            .insert(text.to_string(), Scripted::Fixed(response));
        self
    }

    /// 让查询文本的搜索失败
    pub fn with_search_error(self, text: &str, error: AppError) -> Self {
        self.script
            .lock()
            .searches
            .insert(text.to_string(), Scripted::Fail(error));
        self
    }

    /// 查询文本的响应延迟
    pub fn with_search_delay(self, text: &str, delay: Duration) -> Self {
        self.script
            .lock()
            .search_delays
            .insert(text.to_string(), delay);
        self
    }

    pub fn with_suggestions(self, prefix: &str, suggestions: &[&str]) -> Self {
        self.script.lock().suggestions.insert(
            prefix.to_string(),
            suggestions.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_suggest_delay(self, prefix: &str, delay: Duration) -> Self {
        self.script
            .lock()
            .suggest_delays
            .insert(prefix.to_string(), delay);
        self
    }

    pub fn with_suggest_error(self, error: AppError) -> Self {
        self.script.lock().suggest_error = Some(error);
        self
    }

    pub fn with_brands(self, brands: &[&str]) -> Self {
        self.script.lock().brands = brands.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_models(self, brand: &str, models: &[&str]) -> Self {
        self.script.lock().models.insert(
            brand.to_string(),
            models.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_diameters(self, diameters: &[u32]) -> Self {
        self.script.lock().diameters = diameters.to_vec();
        self
    }

    pub fn with_popular(self, popular: &[&str]) -> Self {
        self.script.lock().popular = popular.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_statistics(self, statistics: SearchStatistics) -> Self {
        self.script.lock().statistics = statistics;
        self
    }

    /// 让之后的所有搜索失败（可在运行中切换）
    pub fn set_search_error(&self, error: Option<AppError>) {
        self.script.lock().search_error = error;
    }

    /// 让查找类接口失败（可在运行中切换）
    pub fn set_lookup_error(&self, error: Option<AppError>) {
        self.script.lock().lookup_error = error;
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn search_calls(&self) -> Vec<SearchQuery> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                GatewayCall::Search(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn suggest_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                GatewayCall::Suggest(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    fn log(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }

    fn lookup_error(&self) -> Result<()> {
        match &self.script.lock().lookup_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn paginate(items: &[SearchResultItem], offset: usize, limit: usize) -> SearchResponse {
    let page: Vec<SearchResultItem> = items.iter().skip(offset).take(limit).cloned().collect();
    SearchResponse {
        has_more: offset + page.len() < items.len(),
        total: items.len(),
        items: page,
        ..Default::default()
    }
}

#[async_trait]
impl SearchGateway for InMemoryGateway {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.log(GatewayCall::Search(query.clone()));

        let (scripted, delay) = {
            let script = self.script.lock();
            let scripted = match &script.search_error {
                Some(e) => Some(Scripted::Fail(e.clone())),
                None => script.searches.get(query.text()).cloned(),
            };
            (scripted, script.search_delays.get(query.text()).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(Scripted::Catalogue(items)) => Ok(paginate(&items, query.offset(), query.limit())),
            Some(Scripted::Fixed(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(SearchResponse::default()),
        }
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<TireSuggestion>> {
        self.log(GatewayCall::Suggest(prefix.to_string()));

        let (result, delay) = {
            let script = self.script.lock();
            let result = match &script.suggest_error {
                Some(e) => Err(e.clone()),
                None => Ok(script.suggestions.get(prefix).cloned().unwrap_or_default()),
            };
            (result, script.suggest_delays.get(prefix).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(result?
            .into_iter()
            .take(limit)
            .map(TireSuggestion::remote)
            .collect())
    }

    async fn record_query(&self, query: &str, result_count: usize) -> Result<()> {
        self.log(GatewayCall::RecordQuery {
            query: query.to_string(),
            result_count,
        });
        Ok(())
    }

    async fn popular_queries(&self, limit: usize) -> Result<Vec<String>> {
        self.log(GatewayCall::Popular);
        self.lookup_error()?;
        Ok(self.script.lock().popular.iter().take(limit).cloned().collect())
    }

    async fn brands(&self) -> Result<Vec<String>> {
        self.log(GatewayCall::Brands);
        self.lookup_error()?;
        Ok(self.script.lock().brands.clone())
    }

    async fn models(&self, brand: &str) -> Result<Vec<String>> {
        self.log(GatewayCall::Models(brand.to_string()));
        self.lookup_error()?;
        Ok(self
            .script
            .lock()
            .models
            .get(brand)
            .cloned()
            .unwrap_or_default())
    }

    async fn diameters(&self) -> Result<Vec<u32>> {
        self.log(GatewayCall::Diameters);
        self.lookup_error()?;
        Ok(self.script.lock().diameters.clone())
    }

    async fn statistics(&self) -> Result<SearchStatistics> {
        self.log(GatewayCall::Statistics);
        self.lookup_error()?;
        Ok(self.script.lock().statistics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TireSize;

    fn item(id: i64) -> SearchResultItem {
        SearchResultItem {
            id,
            brand_name: "Kia".into(),
            model_name: format!("Model {id}"),
            year_from: 2015,
            year_to: 2020,
            tire_sizes: vec![TireSize::new(195, 65, 15)],
            match_score: None,
        }
    }

    #[tokio::test]
    async fn test_catalogue_pagination() {
        let gateway = InMemoryGateway::new().with_catalogue("kia", (1..=5).map(item).collect());

        let first = gateway.search(&SearchQuery::new("kia", 2)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total, 5);
        assert!(first.has_more);

        let last = gateway
            .search(&SearchQuery::new("kia", 2).with_offset(4))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
        assert_eq!(gateway.search_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_query_is_empty() {
        let gateway = InMemoryGateway::new();
        let response = gateway.search(&SearchQuery::new("zaz", 20)).await.unwrap();
        assert!(response.items.is_empty());
        assert!(gateway.suggest("z", 5).await.unwrap().is_empty());
        assert_eq!(gateway.suggest_calls(), vec!["z"]);
    }
}
