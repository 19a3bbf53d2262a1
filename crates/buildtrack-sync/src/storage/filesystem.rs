//! Filesystem storage backend

use crate::config::FilesystemConfig;
use crate::storage::Storage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Filesystem storage backend
///
/// Stores each key as a JSON file in one directory.
/// Persistent across restarts, suitable for a single client process.
#[derive(Clone)]
pub struct FilesystemStorage {
    config: FilesystemConfig,
}

impl FilesystemStorage {
    /// Create a new filesystem storage backend
    pub async fn new(config: FilesystemConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)
            .await
            .with_context(|| format!("Failed to create storage directory {:?}", config.path))?;

        Ok(Self { config })
    }

    /// Get the file path for a key
    fn key_to_path(&self, key: &str) -> PathBuf {
        // Percent-encoding keeps keys like `tasks:project:1` filesystem-safe and reversible
        self.config.path.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl Storage for FilesystemStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_to_path(key);

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read storage file {:?}", path))?;

        Ok(Some(content))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.key_to_path(key);
        let tmp_path = path.with_extension("json.tmp");

        // Write-then-rename so a crash never leaves a half-written document
        fs::write(&tmp_path, value)
            .await
            .with_context(|| format!("Failed to write storage file {:?}", tmp_path))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace storage file {:?}", path))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);

        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to delete storage file {:?}", path))?;
        }

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.config.path)
            .await
            .context("Failed to read storage directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                match urlencoding::decode(stem) {
                    Ok(key) => keys.push(key.into_owned()),
                    Err(_) => tracing::warn!("Skipping storage file with undecodable name: {:?}", path),
                }
            }
        }

        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> FilesystemConfig {
        FilesystemConfig {
            path: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_filesystem_storage_basic() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(config_for(&temp_dir)).await.unwrap();

        storage.set("tasks:project:1", "[]".to_string()).await.unwrap();
        assert_eq!(storage.get("tasks:project:1").await.unwrap().as_deref(), Some("[]"));

        let keys = storage.keys().await.unwrap();
        assert_eq!(keys, vec!["tasks:project:1".to_string()]);

        storage.delete("tasks:project:1").await.unwrap();
        assert!(storage.get("tasks:project:1").await.unwrap().is_none());
        // Deleting a missing key is not an error
        storage.delete("tasks:project:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_storage_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let storage = FilesystemStorage::new(config_for(&temp_dir)).await.unwrap();
            storage.set("pending_actions", "[1]".to_string()).await.unwrap();
        }

        // New instance over the same directory, as after a restart
        {
            let storage = FilesystemStorage::new(config_for(&temp_dir)).await.unwrap();
            let retrieved = storage.get("pending_actions").await.unwrap();
            assert_eq!(retrieved.as_deref(), Some("[1]"));
        }
    }
}
