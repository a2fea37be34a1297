use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "TIRE_SEARCH_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（低 → 高）：
    /// 1. 内置默认值
    /// 2. ./tire-search.toml
    /// 3. 环境变量 `TIRE_SEARCH_*`（嵌套字段用 `__` 分隔）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.gateway.base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingBaseUrl);
        }

        if config.search.page_size == 0 {
            return Err(ConfigValidationError::InvalidPageSize);
        }

        if config.search.history_limit == 0 {
            return Err(ConfigValidationError::InvalidHistoryLimit);
        }

        if config.gateway.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        match config.storage.backend.as_str() {
            "file" | "memory" => Ok(()),
            other => Err(ConfigValidationError::UnknownStorageBackend(
                other.to_string(),
            )),
        }
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("搜索 API 地址未配置")]
    MissingBaseUrl,

    #[error("每页结果数无效，必须大于 0")]
    InvalidPageSize,

    #[error("搜索历史上限无效，必须大于 0")]
    InvalidHistoryLimit,

    #[error("请求超时无效，必须大于 0")]
    InvalidTimeout,

    #[error("未知的存储后端: {0}")]
    UnknownStorageBackend(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("tire-search.toml")
}
