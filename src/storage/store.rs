use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// 持久化键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    /// 搜索历史（最近的在前）
    SearchHistory,
    /// 收藏的结果 ID
    Favorites,
    /// 最近一次使用的过滤条件
    RecentFilters,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [
        StorageKey::SearchHistory,
        StorageKey::Favorites,
        StorageKey::RecentFilters,
    ];

    /// 稳定的存储名称
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::SearchHistory => "searchHistory",
            StorageKey::Favorites => "favorites",
            StorageKey::RecentFilters => "recentFilters",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 持久化端口
///
/// 只保存 JSON 值，类型化读写由 [`Preferences`](super::Preferences) 负责。
/// 实现可以返回错误；调用方把所有错误视为非致命。
pub trait PersistenceStore: Send + Sync {
    /// 读取值，不存在时返回 `None`
    fn load(&self, key: StorageKey) -> Result<Option<serde_json::Value>>;

    /// 写入值
    fn save(&self, key: StorageKey, value: &serde_json::Value) -> Result<()>;

    /// 删除值，不存在时也返回成功
    fn remove(&self, key: StorageKey) -> Result<()>;
}
