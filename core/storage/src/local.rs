//! Filesystem-backed key-value store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::kv::KeyValueStore;
use pulsetrack_common::{Error, Result};

/// Key-value store that keeps one file per key under a root directory.
///
/// Keys map directly to file names, so callers use flat, filesystem-safe
/// keys (the sync engine only ever uses two fixed document keys). Read and
/// write failures are reported as `Error::Storage` rather than panicking so
/// callers can fall back to a session-only queue.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// # Postconditions
    /// - Root directory exists
    ///
    /// # Errors
    /// - Directory creation failure
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            std::fs::create_dir_all(&root)
                .map_err(|e| Error::Storage(format!("cannot create store root: {}", e)))?;
        }
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(Error::InvalidInput(format!("invalid store key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("read {} failed: {}", key, e))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash mid-write cannot corrupt the document.
        let tmp = self.root.join(format!("{}.tmp", key));
        fs::write(&tmp, value)
            .await
            .map_err(|e| Error::Storage(format!("write {} failed: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Storage(format!("write {} failed: {}", key, e)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("remove {} failed: {}", key, e))),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::Storage(format!("list keys failed: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Storage(format!("list keys failed: {}", e)))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(".tmp") {
                    keys.push(name.to_string());
                }
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path()).unwrap();

        store.set("queue", "{\"v\":1}".to_string()).await.unwrap();
        assert_eq!(
            store.get("queue").await.unwrap(),
            Some("{\"v\":1}".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path()).unwrap();
        assert!(store.get("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path()).unwrap();

        store.set("k", "v".to_string()).await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path()).unwrap();

        assert!(store.get("../escape").await.is_err());
        assert!(store.set("a/b", "v".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp = TempDir::new().unwrap();

        {
            let store = FileStore::new(temp.path()).unwrap();
            store.set("queue", "persisted".to_string()).await.unwrap();
        }

        let store = FileStore::new(temp.path()).unwrap();
        assert_eq!(
            store.get("queue").await.unwrap(),
            Some("persisted".to_string())
        );
        assert_eq!(store.keys().await.unwrap(), vec!["queue".to_string()]);
    }
}
