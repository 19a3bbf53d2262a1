pub mod access;
pub mod enqueue;
pub mod pending;
pub mod sync;

use anyhow::Result;
use buildtrack_sync::{Config, MemoryRemote, OfflineQueue};
use std::sync::Arc;

/// Open the configured queue over the given mock backend
pub async fn open_queue(config: &Config, remote: MemoryRemote) -> Result<OfflineQueue> {
    OfflineQueue::from_config(config, Arc::new(remote)).await
}
