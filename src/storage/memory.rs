//! 内存存储
//!
//! 用于测试以及 `backend = "memory"` 配置。可以注入写入失败，模拟
//! 配额耗尽或存储被禁用的情况。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{AppError, Result};
use crate::storage::store::{PersistenceStore, StorageKey};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<StorageKey, serde_json::Value>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置数据
    pub fn with_entry(self, key: StorageKey, value: serde_json::Value) -> Self {
        self.entries.write().insert(key, value);
        self
    }

    /// 让后续写入失败
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 让后续读取失败
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// 成功写入（含删除）的次数
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: StorageKey) -> Option<serde_json::Value> {
        self.entries.read().get(&key).cloned()
    }

    pub fn contains(&self, key: StorageKey) -> bool {
        self.entries.read().contains_key(&key)
    }
}

impl PersistenceStore for MemoryStore {
    fn load(&self, key: StorageKey) -> Result<Option<serde_json::Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("read of {} refused", key)));
        }
        Ok(self.get(key))
    }

    fn save(&self, key: StorageKey, value: &serde_json::Value) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("quota exceeded writing {}", key)));
        }
        self.entries.write().insert(key, value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("remove of {} refused", key)));
        }
        self.entries.write().remove(&key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
