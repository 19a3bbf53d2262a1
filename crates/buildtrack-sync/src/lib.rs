// File: buildtrack-sync/src/lib.rs
// Purpose: Main entry point for buildtrack-sync library

//! # buildtrack-sync
//!
//! Offline action queue for the BuildTrack client.
//!
//! Mutations made without a connection are persisted locally and replayed
//! in order once the network returns. Tasks created offline get a
//! temporary id; later actions that reference it are pointed at the
//! server-assigned id during replay.
//!
//! ## Example
//!
//! ```rust
//! use buildtrack_core::{ActionPayload, NewTask, TemporaryId};
//! use buildtrack_sync::{MemoryRemote, MemoryStorage, NetworkMonitor, OfflineQueue, SyncOutcome};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let network = NetworkMonitor::new(false);
//!     let queue = OfflineQueue::new(
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(MemoryRemote::new()),
//!         network.clone(),
//!     );
//!
//!     queue
//!         .enqueue(1, ActionPayload::CreateTask {
//!             temp_id: TemporaryId::new(),
//!             task: NewTask::new("Pour footings"),
//!         })
//!         .await?;
//!
//!     network.set_online(true);
//!     assert_eq!(queue.try_sync().await, SyncOutcome::Synced { synced: 1 });
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod events;
pub mod network;
pub mod queue;
pub mod remap;
pub mod remote;
pub mod storage;
pub mod store;
pub mod task_cache;

pub use config::{Config, FilesystemConfig, LoggingConfig, StorageBackend, SyncSettings};
pub use events::{QueueEvent, SyncOutcome};
pub use network::NetworkMonitor;
pub use queue::{DispatchError, OfflineQueue};
pub use remap::IdentifierRemap;
pub use remote::{MemoryRemote, RemoteApi, RemoteCall, RemoteError};
pub use storage::filesystem::FilesystemStorage;
pub use storage::memory::MemoryStorage;
pub use storage::Storage;
pub use store::{QueueStore, QUEUE_KEY};
pub use task_cache::TaskCache;
