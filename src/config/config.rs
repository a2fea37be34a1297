use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 搜索网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// API 根地址
    pub base_url: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 连接超时（秒）
    pub connect_timeout_secs: u64,
    /// User-Agent
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            timeout_secs: 12,
            connect_timeout_secs: 5,
            user_agent: concat!("tire-search/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 搜索会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 每页结果数
    pub page_size: usize,
    /// 输入防抖间隔（毫秒）
    pub debounce_ms: u64,
    /// 触发联想的最少字符数
    pub min_suggest_chars: usize,
    /// 联想条数上限
    pub suggestion_limit: usize,
    /// 搜索历史上限
    pub history_limit: usize,
    /// 查询最大长度（字符）
    pub max_query_chars: usize,
    /// 防抖后自动搜索
    pub auto_search: bool,
    /// 是否启用服务端辅助解析（use_llm）
    pub use_assisted_parsing: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            debounce_ms: 300,
            min_suggest_chars: 2,
            suggestion_limit: 8,
            history_limit: 20,
            max_query_chars: 200,
            auto_search: false,
            use_assisted_parsing: true,
        }
    }
}

/// 本地持久化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储后端: "file" 或 "memory"
    pub backend: String,
    /// 文件存储目录
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".into(),
            path: PathBuf::from("./data/tire-search"),
        }
    }
}

/// 查找数据缓存 TTL（秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub suggestions_ttl: u64,
    pub popular_ttl: u64,
    pub reference_ttl: u64,
    pub statistics_ttl: u64,
    /// 每个缓存的最大条目数
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            suggestions_ttl: 5 * 60,
            popular_ttl: 30 * 60,
            reference_ttl: 60 * 60,
            statistics_ttl: 15 * 60,
            max_entries: 256,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 网关配置
    pub gateway: GatewayConfig,
    /// 搜索配置
    pub search: SearchConfig,
    /// 持久化配置
    pub storage: StorageConfig,
    /// 缓存配置
    pub cache: CacheConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".into();
        config.storage.backend = "memory".into();
        config
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config
    }
}
