//! 查找数据服务
//!
//! 品牌、车型、直径、热门查询和统计都是可以独立缓存的参考数据。
//! 失败直接返回给调用方且不写缓存。

use futures_util::future::join3;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::gateway::SearchGateway;
use crate::gateway::cache::{CacheStats, TtlCache};
use crate::models::SearchStatistics;

const BRANDS_KEY: &str = "brands";
const DIAMETERS_KEY: &str = "diameters";

pub struct LookupService {
    gateway: Arc<dyn SearchGateway>,
    popular: TtlCache<usize, Vec<String>>,
    reference: TtlCache<String, Vec<String>>,
    diameters: TtlCache<&'static str, Vec<u32>>,
    statistics: TtlCache<(), SearchStatistics>,
}

impl LookupService {
    pub fn new(gateway: Arc<dyn SearchGateway>, config: &CacheConfig) -> Self {
        let max = config.max_entries;
        Self {
            gateway,
            popular: TtlCache::new(Duration::from_secs(config.popular_ttl), max),
            reference: TtlCache::new(Duration::from_secs(config.reference_ttl), max),
            diameters: TtlCache::new(Duration::from_secs(config.reference_ttl), 1),
            statistics: TtlCache::new(Duration::from_secs(config.statistics_ttl), 1),
        }
    }

    /// 热门查询
    pub async fn popular_queries(&self, limit: usize) -> Result<Vec<String>> {
        if let Some(hit) = self.popular.get(&limit) {
            return Ok(hit);
        }
        let fresh = self.gateway.popular_queries(limit).await?;
        self.popular.insert(limit, fresh.clone());
        Ok(fresh)
    }

    /// 品牌列表
    pub async fn brands(&self) -> Result<Vec<String>> {
        let key = BRANDS_KEY.to_string();
        if let Some(hit) = self.reference.get(&key) {
            return Ok(hit);
        }
        let fresh = self.gateway.brands().await?;
        self.reference.insert(key, fresh.clone());
        Ok(fresh)
    }

    /// 车型列表，按品牌（不区分大小写）缓存
    pub async fn models(&self, brand: &str) -> Result<Vec<String>> {
        let brand = brand.trim();
        if brand.is_empty() {
            return Ok(Vec::new());
        }

        let key = format!("models:{}", brand.to_lowercase());
        if let Some(hit) = self.reference.get(&key) {
            return Ok(hit);
        }
        let fresh = self.gateway.models(brand).await?;
        self.reference.insert(key, fresh.clone());
        Ok(fresh)
    }

    /// 直径列表
    pub async fn diameters(&self) -> Result<Vec<u32>> {
        if let Some(hit) = self.diameters.get(&DIAMETERS_KEY) {
            return Ok(hit);
        }
        let mut fresh = self.gateway.diameters().await?;
        fresh.sort_unstable();
        fresh.dedup();
        self.diameters.insert(DIAMETERS_KEY, fresh.clone());
        Ok(fresh)
    }

    /// 搜索统计
    pub async fn statistics(&self) -> Result<SearchStatistics> {
        if let Some(hit) = self.statistics.get(&()) {
            return Ok(hit);
        }
        let fresh = self.gateway.statistics().await?;
        self.statistics.insert((), fresh.clone());
        Ok(fresh)
    }

    /// 并发预取品牌、直径和热门查询，单项失败只记录日志
    pub async fn warm_up(&self, popular_limit: usize) {
        let (brands, diameters, popular) = join3(
            self.brands(),
            self.diameters(),
            self.popular_queries(popular_limit),
        )
        .await;

        for (name, failed) in [
            ("brands", brands.err()),
            ("diameters", diameters.err()),
            ("popular", popular.err()),
        ] {
            if let Some(e) = failed {
                warn!(lookup = name, error = %e, "Lookup warm-up failed");
            }
        }
        debug!("Lookup caches warmed up");
    }

    pub fn invalidate_all(&self) {
        self.popular.clear();
        self.reference.clear();
        self.diameters.clear();
        self.statistics.clear();
    }

    /// 参考数据缓存统计
    pub fn reference_stats(&self) -> CacheStats {
        self.reference.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::gateway::memory::{GatewayCall, InMemoryGateway};

    fn service(gateway: Arc<InMemoryGateway>) -> LookupService {
        LookupService::new(gateway, &CacheConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_brands_cached_until_ttl() {
        let gateway = Arc::new(InMemoryGateway::new().with_brands(&["Audi", "BMW"]));
        let lookup = service(gateway.clone());

        assert_eq!(lookup.brands().await.unwrap(), vec!["Audi", "BMW"]);
        assert_eq!(lookup.brands().await.unwrap(), vec!["Audi", "BMW"]);
        assert_eq!(gateway.count(|c| *c == GatewayCall::Brands), 1);

        tokio::time::advance(Duration::from_secs(60 * 60 + 1)).await;
        lookup.brands().await.unwrap();
        assert_eq!(gateway.count(|c| *c == GatewayCall::Brands), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics_ttl_shorter_than_reference() {
        let gateway = Arc::new(InMemoryGateway::new());
        let lookup = service(gateway.clone());

        lookup.statistics().await.unwrap();
        tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;
        lookup.statistics().await.unwrap();
        assert_eq!(gateway.count(|c| *c == GatewayCall::Statistics), 2);
    }

    #[tokio::test]
    async fn test_models_keyed_by_brand_case_insensitive() {
        let gateway = Arc::new(InMemoryGateway::new().with_models("Audi", &["A4", "Q5"]));
        let lookup = service(gateway.clone());

        assert_eq!(lookup.models("Audi").await.unwrap(), vec!["A4", "Q5"]);
        assert_eq!(lookup.models("audi ").await.unwrap(), vec!["A4", "Q5"]);
        assert!(lookup.models("  ").await.unwrap().is_empty());
        assert_eq!(
            gateway.count(|c| matches!(c, GatewayCall::Models(_))),
            1
        );
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let gateway = Arc::new(InMemoryGateway::new().with_diameters(&[17, 15, 16, 17]));
        gateway.set_lookup_error(Some(AppError::Network("down".into())));
        let lookup = service(gateway.clone());

        assert!(lookup.diameters().await.is_err());

        gateway.set_lookup_error(None);
        assert_eq!(lookup.diameters().await.unwrap(), vec![15, 16, 17]);
        assert_eq!(gateway.count(|c| *c == GatewayCall::Diameters), 2);
    }

    #[tokio::test]
    async fn test_warm_up_and_invalidate() {
        let gateway = Arc::new(
            InMemoryGateway::new()
                .with_brands(&["Kia"])
                .with_diameters(&[16])
                .with_popular(&["Kia Rio", "Kia Ceed"]),
        );
        let lookup = service(gateway.clone());

        lookup.warm_up(5).await;
        assert_eq!(lookup.popular_queries(5).await.unwrap().len(), 2);
        assert_eq!(gateway.count(|c| *c == GatewayCall::Popular), 1);

        lookup.invalidate_all();
        lookup.popular_queries(5).await.unwrap();
        assert_eq!(gateway.count(|c| *c == GatewayCall::Popular), 2);
    }
}
