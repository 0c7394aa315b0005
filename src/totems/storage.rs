//! 💾 Storage collaborators - opaque key/value blob stores
//!
//! The engine only ever asks for `load(key)` and `save(bytes, key)`.
//! `FileStorage` keeps one JSON file per key inside a data directory,
//! `MemoryStorage` lives in RAM for tests and ephemeral sessions.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::error::StorageError;

/// Key/value blob store shared by every engine of one process
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn save(&self, bytes: &[u8], key: &str) -> Result<(), StorageError>;
}

/// Directory-backed storage, one `<key>.json` file per key
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the data directory
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).map_err(|source| StorageError::Io {
                key: data_dir.display().to_string(),
                source,
            })?;
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.data_dir.join(format!("{}.json", file_name))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("No stored record for '{}' at {:?}", key, path);
            return Ok(None);
        }

        fs::read(&path)
            .map(Some)
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn save(&self, bytes: &[u8], key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        // tmp + rename: readers never see a half-written record
        fs::write(&tmp_path, bytes).map_err(io_err)?;
        fs::rename(&tmp_path, &path).map_err(io_err)?;

        debug!("Saved {} bytes for '{}' to {:?}", bytes.len(), key, path);
        Ok(())
    }
}

/// In-memory storage
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, Vec<u8>>>,
    reject_writes: AtomicBool,
    rejected_key: RwLock<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail until switched back
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Makes `save` fail for one key only; `None` lifts the restriction
    pub fn reject_writes_for(&self, key: Option<&str>) {
        *self.rejected_key.write() = key.map(str::to_string);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.read().contains_key(key)
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn save(&self, bytes: &[u8], key: &str) -> Result<(), StorageError> {
        let rejected = self.reject_writes.load(Ordering::SeqCst)
            || self.rejected_key.read().as_deref() == Some(key);
        if rejected {
            return Err(StorageError::Unavailable(format!(
                "writes rejected for '{}'",
                key
            )));
        }
        self.records.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("codex_data")).unwrap();

        assert!(storage.load("codex.chapters").unwrap().is_none());

        storage.save(b"{\"a\":1}", "codex.chapters").unwrap();
        let loaded = storage.load("codex.chapters").unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert!(storage.data_dir().join("codex.chapters.json").exists());
    }

    #[test]
    fn test_file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.save(b"x", "../escape/attempt").unwrap();
        assert!(dir.path().join(".._escape_attempt.json").exists());
        assert_eq!(storage.load("../escape/attempt").unwrap().unwrap(), b"x");
    }

    #[test]
    fn test_memory_storage_rejects_writes_on_demand() {
        let storage = MemoryStorage::new();
        storage.save(b"1", "profile").unwrap();

        storage.reject_writes(true);
        assert!(storage.save(b"2", "profile").is_err());
        assert_eq!(storage.load("profile").unwrap().unwrap(), b"1");

        storage.reject_writes(false);
        storage.save(b"2", "profile").unwrap();
        assert_eq!(storage.keys(), vec!["profile".to_string()]);
    }

    #[test]
    fn test_memory_storage_rejects_single_key() {
        let storage = MemoryStorage::new();
        storage.reject_writes_for(Some("revelation.pending"));

        assert!(storage.save(b"1", "revelation.pending").is_err());
        storage.save(b"1", "profile").unwrap();
        assert!(!storage.contains("revelation.pending"));

        storage.reject_writes_for(None);
        storage.save(b"1", "revelation.pending").unwrap();
        assert!(storage.contains("revelation.pending"));
    }
}
