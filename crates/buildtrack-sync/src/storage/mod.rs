//! Local storage backends for the offline queue and task caches

use anyhow::Result;
use async_trait::async_trait;

pub mod filesystem;
pub mod memory;
#[cfg(test)]
pub(crate) mod testing;

/// Key/value store holding serialized JSON documents.
///
/// Mirrors the browser's local storage: string keys, string values, no
/// transactions. Read-modify-write atomicity is provided one layer up by
/// [`QueueStore`](crate::store::QueueStore).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the raw value stored under a key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under a key
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get all keys
    async fn keys(&self) -> Result<Vec<String>>;

    /// Get storage backend name
    fn name(&self) -> &'static str;
}
