//! 存储层模块
//!
//! 本地持久化：搜索历史、收藏和最近使用的过滤条件。支持文件和内存两种后端。

pub mod factory;
pub mod file;
pub mod memory;
pub mod preferences;
pub mod store;

pub use factory::StorageFactory;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use preferences::{DEFAULT_HISTORY_LIMIT, Preferences, push_history};
pub use store::{PersistenceStore, StorageKey};
