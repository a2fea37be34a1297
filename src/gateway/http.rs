//! HTTP 搜索网关

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::config::GatewayConfig;
use crate::error::{AppError, ErrorResponse, Result};
use crate::gateway::SearchGateway;
use crate::models::{SearchQuery, SearchResponse, SearchStatistics, TireSuggestion, decode_search_response};

#[derive(Deserialize)]
struct SuggestionsBody {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct PopularBody {
    #[serde(default)]
    popular_queries: Vec<String>,
}

#[derive(Deserialize)]
struct BrandsBody {
    #[serde(default)]
    brands: Vec<String>,
}

#[derive(Deserialize)]
struct ModelsBody {
    #[serde(default)]
    models: Vec<String>,
}

#[derive(Deserialize)]
struct DiametersBody {
    #[serde(default)]
    diameters: Vec<u32>,
}

/// 基于 reqwest 的搜索网关
pub struct HttpSearchGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/tire_search{}", self.base_url, path)
    }

    /// 发送请求并返回成功响应的原始文本
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("读取响应失败: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.describe())
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(AppError::Network(format!("HTTP {}: {}", status.as_u16(), detail)));
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| AppError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl SearchGateway for HttpSearchGateway {
    #[instrument(skip(self, query), fields(query = query.text(), offset = query.offset()))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let started = Instant::now();
        let body = self
            .send(self.client.post(self.url("")).json(query))
            .await?;
        let response = decode_search_response(&body, query.offset())?;

        debug!(
            items = response.items.len(),
            total = response.total,
            conversation = response.is_conversation(),
            took_ms = started.elapsed().as_millis() as u64,
            "Search response decoded"
        );
        Ok(response)
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<TireSuggestion>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let limit = limit.to_string();
        let body: SuggestionsBody = self
            .get_json(
                self.client
                    .get(self.url("/suggestions"))
                    .query(&[("q", prefix), ("limit", limit.as_str())]),
            )
            .await?;

        Ok(body
            .suggestions
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(TireSuggestion::remote)
            .collect())
    }

    async fn record_query(&self, query: &str, result_count: usize) -> Result<()> {
        self.send(self.client.post(self.url("/history")).json(&serde_json::json!({
            "query": query,
            "results_count": result_count,
        })))
        .await?;
        Ok(())
    }

    async fn popular_queries(&self, limit: usize) -> Result<Vec<String>> {
        let body: PopularBody = self
            .get_json(
                self.client
                    .get(self.url("/popular"))
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(body.popular_queries)
    }

    async fn brands(&self) -> Result<Vec<String>> {
        let body: BrandsBody = self.get_json(self.client.get(self.url("/brands"))).await?;
        Ok(body.brands)
    }

    async fn models(&self, brand: &str) -> Result<Vec<String>> {
        let body: ModelsBody = self
            .get_json(
                self.client
                    .get(self.url("/models"))
                    .query(&[("brand", brand)]),
            )
            .await?;
        Ok(body.models)
    }

    async fn diameters(&self) -> Result<Vec<u32>> {
        let body: DiametersBody = self
            .get_json(self.client.get(self.url("/diameters")))
            .await?;
        Ok(body.diameters)
    }

    async fn statistics(&self) -> Result<SearchStatistics> {
        self.get_json(self.client.get(self.url("/statistics"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> HttpSearchGateway {
        HttpSearchGateway::with_client(reqwest::Client::new(), &format!("{}/", server.uri()))
    }

    #[tokio::test]
    async fn test_search_posts_query_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tire_search"))
            .and(body_json(json!({
                "query": "BMW 3 Series 2020",
                "limit": 20,
                "offset": 0,
                "use_llm": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 1, "brand_name": "BMW", "model_name": "3 Series", "year_from": 2019, "year_to": 2022,
                     "tire_sizes": [{"width": 225, "height": 45, "diameter": 17, "type": "stock"}]}
                ],
                "total": 1,
                "pagination": {"offset": 0, "limit": 20, "has_more": false}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = SearchQuery::new("BMW 3 Series 2020", 20).with_assisted_parsing(true);
        let response = gateway(&server).search(&query).await.unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].model_name, "3 Series");
        assert!(!response.has_more);
    }

    #[tokio::test]
    async fn test_search_http_error_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tire_search"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"detail": "maintenance"})),
            )
            .mount(&server)
            .await;

        let err = gateway(&server)
            .search(&SearchQuery::new("kia", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(ref d) if d.contains("503") && d.contains("maintenance")));
    }

    #[tokio::test]
    async fn test_search_malformed_body_is_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tire_search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .search(&SearchQuery::new("kia", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let gateway = HttpSearchGateway::with_client(reqwest::Client::new(), &uri);
        let err = gateway
            .search(&SearchQuery::new("kia", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }

    #[tokio::test]
    async fn test_suggest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tire_search/suggestions"))
            .and(query_param("q", "bm"))
            .and(query_param("limit", "5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"suggestions": ["BMW X5", "", "BMW 3 Series"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let suggestions = gateway.suggest("bm", 5).await.unwrap();
        assert_eq!(
            suggestions,
            vec![
                TireSuggestion::remote("BMW X5"),
                TireSuggestion::remote("BMW 3 Series")
            ]
        );

        // 空前缀不发请求
        assert!(gateway.suggest("  ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_query_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tire_search/history"))
            .and(body_json(json!({"query": "audi a4", "results_count": 3})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server).record_query("audi a4", 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_lookup_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tire_search/brands"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"brands": ["Audi", "BMW"]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tire_search/models"))
            .and(query_param("brand", "Audi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": ["A4", "Q5"]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tire_search/diameters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"diameters": [15, 16, 17]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tire_search/popular"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"popular_queries": ["Kia Rio"]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tire_search/statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_searches": 42, "unique_queries": 10, "average_results": 3.5
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        assert_eq!(gateway.brands().await.unwrap(), vec!["Audi", "BMW"]);
        assert_eq!(gateway.models("Audi").await.unwrap(), vec!["A4", "Q5"]);
        assert_eq!(gateway.diameters().await.unwrap(), vec![15, 16, 17]);
        assert_eq!(gateway.popular_queries(10).await.unwrap(), vec!["Kia Rio"]);
        let stats = gateway.statistics().await.unwrap();
        assert_eq!(stats.total_searches, 42);
        assert!(stats.top_brands.is_empty());
    }
}
