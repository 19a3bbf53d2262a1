// File: buildtrack-sync/src/events.rs
// Purpose: Notifications emitted by the offline queue

use buildtrack_core::PendingAction;
use serde::{Deserialize, Serialize};

/// Result of one `try_sync` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every action in the pass was applied
    Synced { synced: usize },
    /// Some actions failed and stay queued
    Partial { synced: usize, failed: usize },
    /// Queue was empty
    NoOp,
    /// Network reported offline, nothing attempted
    Offline,
    /// Another pass was already running
    Skipped,
}

impl SyncOutcome {
    /// Whether the pass actually ran against the remote
    pub fn ran(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. } | SyncOutcome::Partial { .. })
    }

    pub fn synced(&self) -> usize {
        match self {
            SyncOutcome::Synced { synced } | SyncOutcome::Partial { synced, .. } => *synced,
            _ => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            SyncOutcome::Partial { failed, .. } => *failed,
            _ => 0,
        }
    }

    /// Human-readable message for a toast or status bar
    pub fn notice(&self) -> String {
        match self {
            SyncOutcome::Synced { synced } => {
                format!("Synced {} offline {}", synced, plural(*synced, "change"))
            }
            SyncOutcome::Partial { synced, failed } => format!(
                "Synced {} {}, {} failed and will be retried",
                synced,
                plural(*synced, "change"),
                failed
            ),
            SyncOutcome::NoOp => "Nothing to sync".to_string(),
            SyncOutcome::Offline => "Offline: changes will sync when the connection returns".to_string(),
            SyncOutcome::Skipped => "Sync already in progress".to_string(),
        }
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Event broadcast to queue subscribers
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// An action was stored
    Enqueued { action: PendingAction },
    /// The number of pending actions changed
    QueueChanged { pending: usize },
    /// A pass is starting over this many actions
    SyncStarted { pending: usize },
    /// A pass finished
    SyncCompleted { outcome: SyncOutcome },
}
