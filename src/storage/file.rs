//! JSON 文件存储
//!
//! 每个键一个 `<key>.json` 文件，内容为 `{saved_at, value}` 信封。
//! 写入先落到临时文件再原子重命名，进程中途退出时最多丢失最后一次写入。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::storage::store::{PersistenceStore, StorageKey};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    saved_at: DateTime<Utc>,
    value: serde_json::Value,
}

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // 串行化同一进程内的写入
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 创建文件存储，目录不存在时自动创建
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Storage(format!("无法创建目录 {}: {}", dir.display(), e)))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    /// 读取最后写入时间
    pub fn saved_at(&self, key: StorageKey) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read_envelope(key)?.map(|e| e.saved_at))
    }

    fn read_envelope(&self, key: StorageKey) -> Result<Option<Envelope>> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Storage(format!("{}: {}", path.display(), e))),
        };
        let envelope = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Storage(format!("{} 内容损坏: {}", path.display(), e)))?;
        Ok(Some(envelope))
    }
}

impl PersistenceStore for JsonFileStore {
    fn load(&self, key: StorageKey) -> Result<Option<serde_json::Value>> {
        Ok(self.read_envelope(key)?.map(|e| e.value))
    }

    fn save(&self, key: StorageKey, value: &serde_json::Value) -> Result<()> {
        let _guard = self.write_lock.lock();
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let envelope = Envelope {
            saved_at: Utc::now(),
            value: value.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let mut file = fs::File::create(&tmp)
            .map_err(|e| AppError::Storage(format!("{}: {}", tmp.display(), e)))?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)
            .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;

        debug!(key = %key, bytes = bytes.len(), "Persisted preference");
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        let _guard = self.write_lock.lock();
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("{}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tire-search-store-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_save_load_remove() {
        let dir = temp_dir();
        let store = JsonFileStore::new(&dir).unwrap();

        assert!(store.load(StorageKey::SearchHistory).unwrap().is_none());

        store
            .save(StorageKey::SearchHistory, &json!(["BMW X5", "Audi A4"]))
            .unwrap();
        assert_eq!(
            store.load(StorageKey::SearchHistory).unwrap(),
            Some(json!(["BMW X5", "Audi A4"]))
        );
        assert!(dir.join("searchHistory.json").exists());
        assert!(!dir.join("searchHistory.json.tmp").exists());
        assert!(store.saved_at(StorageKey::SearchHistory).unwrap().is_some());

        store.remove(StorageKey::SearchHistory).unwrap();
        store.remove(StorageKey::SearchHistory).unwrap();
        assert!(store.load(StorageKey::SearchHistory).unwrap().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = temp_dir();
        let store = JsonFileStore::new(&dir).unwrap();
        fs::write(dir.join("favorites.json"), b"{not json").unwrap();

        assert!(matches!(
            store.load(StorageKey::Favorites),
            Err(AppError::Storage(_))
        ));

        let _ = fs::remove_dir_all(dir);
    }
}
