// File: buildtrack-sync/src/store.rs
// Purpose: Persisted pending-action list with atomic read-modify-write

use anyhow::{Context, Result};
use buildtrack_core::{ActionPayload, EntityRef, PendingAction};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::remap::IdentifierRemap;
use crate::storage::Storage;

/// Storage key holding the JSON array of pending actions
pub const QUEUE_KEY: &str = "pending_actions";

/// Typed view over the queue key.
///
/// Every mutation re-reads the stored list under a lock, so concurrent
/// enqueues and the end-of-pass merge never overwrite each other.
#[derive(Clone)]
pub struct QueueStore {
    storage: Arc<dyn Storage>,
    lock: Arc<Mutex<()>>,
}

impl QueueStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// All pending actions in enqueue order; empty when storage can't be read
    pub async fn load(&self) -> Vec<PendingAction> {
        let _guard = self.lock.lock().await;
        self.read().await.unwrap_or_else(|e| {
            tracing::warn!("{:#}", e);
            Vec::new()
        })
    }

    /// Append one action; returns the new queue length
    pub async fn append(&self, action: PendingAction) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut actions = self.read().await?;
        actions.push(action);
        self.write(&actions).await?;
        Ok(actions.len())
    }

    /// Finish a sync pass.
    ///
    /// Drops the consumed actions from whatever is stored *now* (which may
    /// include actions enqueued during the pass) and rewrites temporary
    /// references the pass resolved. Returns the remaining actions.
    pub async fn commit_pass(
        &self,
        consumed: &HashSet<Uuid>,
        remap: &IdentifierRemap,
    ) -> Result<Vec<PendingAction>> {
        let _guard = self.lock.lock().await;
        let stored = self.read().await?;
        let before = stored.len();

        let mut rewritten = 0;
        let remaining: Vec<PendingAction> = stored
            .into_iter()
            .filter(|action| !consumed.contains(&action.id))
            .map(|mut action| {
                rewritten += remap.resolve(&mut action.action);
                action
            })
            .collect();

        if remaining.len() != before || rewritten > 0 {
            self.write(&remaining).await?;
            tracing::debug!(
                "Queue committed: {} removed, {} references rewritten, {} remaining",
                before - remaining.len(),
                rewritten,
                remaining.len()
            );
        }

        Ok(remaining)
    }

    /// Entities of a project that queued actions still create or touch
    pub async fn pending_refs(&self, project_id: i64) -> Result<HashSet<EntityRef>> {
        let _guard = self.lock.lock().await;
        let refs = self
            .read()
            .await?
            .into_iter()
            .filter(|p| p.project_id == project_id)
            .filter_map(|p| match p.action {
                ActionPayload::CreateTask { temp_id, .. } => Some(EntityRef::Temporary(temp_id)),
                other => other.task_ref().cloned(),
            })
            .collect();
        Ok(refs)
    }

    /// Storage errors propagate; only unparseable data reads as empty
    async fn read(&self) -> Result<Vec<PendingAction>> {
        let raw = self
            .storage
            .get(QUEUE_KEY)
            .await
            .with_context(|| format!("Failed to read pending queue from {}", self.storage.name()))?;
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<PendingAction>>(&raw) {
            Ok(actions) => Ok(actions),
            Err(e) => {
                tracing::warn!("Pending queue is corrupted, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn write(&self, actions: &[PendingAction]) -> Result<()> {
        let json = serde_json::to_string(actions).context("Failed to serialize pending queue")?;
        self.storage
            .set(QUEUE_KEY, json)
            .await
            .with_context(|| format!("Failed to write pending queue to {}", self.storage.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::testing::FlakyStorage;
    use buildtrack_core::{NewComment, NewTask, TemporaryId};
    use pretty_assertions::assert_eq;

    fn create(title: &str) -> PendingAction {
        PendingAction::new(
            1,
            ActionPayload::CreateTask {
                temp_id: TemporaryId::new(),
                task: NewTask::new(title),
            },
        )
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = QueueStore::new(Arc::new(MemoryStorage::new()));
        let first = create("first");
        let second = create("second");

        assert_eq!(store.append(first.clone()).await.unwrap(), 1);
        assert_eq!(store.append(second.clone()).await.unwrap(), 2);
        assert_eq!(store.load().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_corrupted_queue_reads_as_empty() {
        let storage = MemoryStorage::new();
        storage.set(QUEUE_KEY, "{not json".to_string()).await.unwrap();

        let store = QueueStore::new(Arc::new(storage));
        assert!(store.load().await.is_empty());

        // Appending over corrupted data starts a fresh list
        assert_eq!(store.append(create("fresh")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_keeps_unconsumed_and_new_actions() {
        let store = QueueStore::new(Arc::new(MemoryStorage::new()));
        let done = create("done");
        let failed = create("failed");
        store.append(done.clone()).await.unwrap();
        store.append(failed.clone()).await.unwrap();

        // Arrives while the pass is running
        let late = create("late");
        store.append(late.clone()).await.unwrap();

        let consumed: HashSet<Uuid> = [done.id].into_iter().collect();
        let remaining = store.commit_pass(&consumed, &IdentifierRemap::new()).await.unwrap();

        assert_eq!(remaining, vec![failed.clone(), late.clone()]);
        assert_eq!(store.load().await, vec![failed, late]);
    }

    #[tokio::test]
    async fn test_commit_rewrites_resolved_references() {
        let store = QueueStore::new(Arc::new(MemoryStorage::new()));
        let tmp = TemporaryId::new();
        let comment = PendingAction::new(
            1,
            ActionPayload::AddComment {
                task_id: tmp.clone().into(),
                comment: NewComment { body: "Photos attached".into(), author_id: None },
                temp_id: None,
            },
        );
        store.append(comment).await.unwrap();

        let mut remap = IdentifierRemap::new();
        remap.record(tmp, 77);
        let remaining = store.commit_pass(&HashSet::new(), &remap).await.unwrap();

        assert_eq!(remaining[0].action.task_ref(), Some(&EntityRef::Server(77)));
        assert_eq!(store.load().await[0].action.task_ref(), Some(&EntityRef::Server(77)));
    }

    #[tokio::test]
    async fn test_commit_without_changes_does_not_write() {
        let storage = MemoryStorage::new();
        let store = QueueStore::new(Arc::new(storage.clone()));
        store.append(create("kept")).await.unwrap();
        let writes = storage.write_count();

        store.commit_pass(&HashSet::new(), &IdentifierRemap::new()).await.unwrap();
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_read_error_does_not_clobber_queue() {
        let storage = FlakyStorage::default();
        let store = QueueStore::new(Arc::new(storage.clone()));
        let mut stored = Vec::new();
        for title in ["one", "two", "three"] {
            let action = create(title);
            store.append(action.clone()).await.unwrap();
            stored.push(action);
        }

        storage.fail_reads(true);
        assert!(store.append(create("four")).await.is_err());
        assert!(store.commit_pass(&HashSet::new(), &IdentifierRemap::new()).await.is_err());
        assert!(store.pending_refs(1).await.is_err());

        storage.fail_reads(false);
        assert_eq!(store.load().await, stored);
    }

    #[tokio::test]
    async fn test_pending_refs_per_project() {
        let store = QueueStore::new(Arc::new(MemoryStorage::new()));
        let tmp = TemporaryId::new();
        store
            .append(PendingAction::new(
                1,
                ActionPayload::CreateTask { temp_id: tmp.clone(), task: NewTask::new("Frame walls") },
            ))
            .await
            .unwrap();
        store
            .append(PendingAction::new(
                2,
                ActionPayload::AddComment {
                    task_id: EntityRef::Server(40),
                    comment: NewComment { body: "Other site".into(), author_id: None },
                    temp_id: None,
                },
            ))
            .await
            .unwrap();

        let refs = store.pending_refs(1).await.unwrap();
        assert_eq!(refs, [EntityRef::Temporary(tmp)].into_iter().collect());
        assert_eq!(store.pending_refs(2).await.unwrap(), [EntityRef::Server(40)].into_iter().collect());
    }
}
