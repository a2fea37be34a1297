//! 存储工厂模块
//!
//! 根据配置创建相应的持久化实例。

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::file::JsonFileStore;
use crate::storage::memory::MemoryStore;
use crate::storage::store::PersistenceStore;

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储实例
    pub fn create(config: &StorageConfig) -> Result<Arc<dyn PersistenceStore>> {
        match config.backend.as_str() {
            "memory" => Ok(Arc::new(MemoryStore::new())),
            "file" => {
                let store = JsonFileStore::new(&config.path)?;
                info!(path = %config.path.display(), "File preference store initialized");
                Ok(Arc::new(store))
            }
            other => Err(AppError::Config(format!("未知的存储后端: {}", other))),
        }
    }

    /// 创建存储实例；文件存储不可用时退回内存存储
    ///
    /// 持久化只是建议性的，不能因为它阻止会话启动。
    pub fn create_or_memory(config: &StorageConfig) -> Arc<dyn PersistenceStore> {
        Self::create(config).unwrap_or_else(|e| {
            warn!(error = %e, "Preference store unavailable, falling back to memory");
            Arc::new(MemoryStore::new())
        })
    }
}
