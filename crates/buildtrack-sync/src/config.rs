// File: buildtrack-sync/src/config.rs
// Purpose: Configuration parsing from buildtrack.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::filesystem::FilesystemStorage;
use crate::storage::memory::MemoryStorage;
use crate::storage::Storage;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageBackend,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory storage (fast, non-persistent)
    Memory,

    /// Filesystem storage (persistent, single client)
    Filesystem(FilesystemConfig),
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Filesystem(FilesystemConfig::default())
    }
}

impl StorageBackend {
    /// Build the configured backend
    pub async fn open(&self) -> Result<Arc<dyn Storage>> {
        match self {
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageBackend::Filesystem(config) => {
                let storage = FilesystemStorage::new(config.clone()).await?;
                Ok(Arc::new(storage))
            }
        }
    }
}

/// Filesystem storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Storage directory path
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Sync behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Initial connectivity assumed before the first network signal
    #[serde(default = "default_true")]
    pub start_online: bool,

    /// Capacity of the queue event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            start_online: true,
            event_capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_storage_path() -> PathBuf {
    PathBuf::from(".buildtrack/storage")
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Missing file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./buildtrack.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("buildtrack.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.sync.start_online);
        assert_eq!(config.logging.level, "info");
        match config.storage {
            StorageBackend::Filesystem(fs) => assert_eq!(fs.path, PathBuf::from(".buildtrack/storage")),
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[test]
    fn test_memory_backend_from_toml() {
        let toml = r#"
            [storage]
            backend = "memory"

            [sync]
            start_online = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.storage, StorageBackend::Memory));
        assert!(!config.sync.start_online);
        assert_eq!(config.sync.event_capacity, 256);
    }

    #[test]
    fn test_filesystem_backend_from_toml() {
        let toml = r#"
            [storage]
            backend = "filesystem"
            path = "/var/lib/buildtrack"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        match config.storage {
            StorageBackend::Filesystem(fs) => assert_eq!(fs.path, PathBuf::from("/var/lib/buildtrack")),
            other => panic!("unexpected backend: {:?}", other),
        }
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_missing_and_broken_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = Config::load(dir.path().join("nope.toml")).unwrap();
        assert!(missing.sync.start_online);

        let broken_path = dir.path().join("broken.toml");
        let mut file = std::fs::File::create(&broken_path).unwrap();
        writeln!(file, "[storage").unwrap();
        assert!(Config::load(&broken_path).is_err());
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let storage = StorageBackend::Memory.open().await.unwrap();
        assert_eq!(storage.name(), "memory");
    }
}
