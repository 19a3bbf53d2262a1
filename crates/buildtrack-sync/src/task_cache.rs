//! Per-project task lists cached for offline reads

use anyhow::{Context, Result};
use buildtrack_core::{ActionPayload, EntityRef, PendingAction, Task};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::remap::IdentifierRemap;
use crate::remote::RemoteApi;
use crate::storage::Storage;
use crate::store::QueueStore;

/// Cached task lists, one storage key per project.
///
/// Queued edits are applied optimistically so boards reflect them before the
/// server has seen them.
#[derive(Clone)]
pub struct TaskCache {
    storage: Arc<dyn Storage>,
    lock: Arc<Mutex<()>>,
}

const KEY_PREFIX: &str = "tasks:project:";

/// Storage key of a project's task list
pub fn project_key(project_id: i64) -> String {
    format!("{}{}", KEY_PREFIX, project_id)
}

impl TaskCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Cached tasks of a project; empty when nothing (or garbage) is stored
    pub async fn load(&self, project_id: i64) -> Vec<Task> {
        let _guard = self.lock.lock().await;
        self.read(project_id).await.unwrap_or_else(|e| {
            tracing::warn!("{:#}", e);
            Vec::new()
        })
    }

    pub async fn store(&self, project_id: i64, tasks: &[Task]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(project_id, tasks).await
    }

    /// Projects that have a cached task list, ascending
    pub async fn cached_projects(&self) -> Result<Vec<i64>> {
        let mut projects: Vec<i64> = self
            .storage
            .keys()
            .await?
            .iter()
            .filter_map(|key| key.strip_prefix(KEY_PREFIX))
            .filter_map(|id| id.parse().ok())
            .collect();
        projects.sort_unstable();
        Ok(projects)
    }

    /// Replace the cache with the server's list, keeping local-only tasks
    pub async fn refresh_from(&self, remote: &dyn RemoteApi, project_id: i64) -> Result<Vec<Task>> {
        let fresh = remote
            .list_tasks(project_id)
            .await
            .with_context(|| format!("Failed to fetch tasks for project {}", project_id))?;

        let _guard = self.lock.lock().await;
        let provisional = self
            .read(project_id)
            .await?
            .into_iter()
            .filter(Task::is_provisional);

        let tasks: Vec<Task> = fresh.into_iter().chain(provisional).collect();
        self.write(project_id, &tasks).await?;
        Ok(tasks)
    }

    /// Reflect a queued action in the cached list
    pub async fn apply_optimistic(&self, pending: &PendingAction) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read(pending.project_id).await?;

        match &pending.action {
            ActionPayload::CreateTask { temp_id, task } => {
                tasks.push(Task {
                    id: EntityRef::Temporary(temp_id.clone()),
                    project_id: pending.project_id,
                    title: task.title.clone(),
                    description: task.description.clone(),
                    status: task.status,
                    assignee_id: task.assignee_id,
                    due_date: task.due_date,
                    updated_at: pending.enqueued_at,
                    pending: true,
                });
            }
            ActionPayload::UpdateTask { task_id, changes } => {
                let Some(task) = tasks.iter_mut().find(|t| &t.id == task_id) else {
                    // Not cached locally; nothing to show
                    return Ok(());
                };
                if let Some(title) = &changes.title {
                    task.title = title.clone();
                }
                if let Some(description) = &changes.description {
                    task.description = Some(description.clone());
                }
                if let Some(status) = changes.status {
                    task.status = status;
                }
                if let Some(assignee_id) = changes.assignee_id {
                    task.assignee_id = Some(assignee_id);
                }
                if let Some(due_date) = changes.due_date {
                    task.due_date = Some(due_date);
                }
                task.updated_at = pending.enqueued_at;
                task.pending = true;
            }
            ActionPayload::AddComment { .. } | ActionPayload::UploadDocument { .. } => return Ok(()),
        }

        self.write(pending.project_id, &tasks).await
    }

    /// Swap confirmed temporary ids for server ids and clear `pending` on
    /// tasks no queued action refers to. Returns the number of ids swapped.
    ///
    /// The queued references are read while the cache lock is held, so a
    /// task enqueued concurrently is never marked settled.
    pub async fn reconcile(
        &self,
        project_id: i64,
        remap: &IdentifierRemap,
        queue: &QueueStore,
    ) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read(project_id).await?;
        if tasks.is_empty() {
            return Ok(0);
        }
        let still_pending = queue.pending_refs(project_id).await?;

        let mut swapped = 0;
        let mut changed = false;
        for task in tasks.iter_mut() {
            let resolved = remap.resolve_ref(&task.id);
            if resolved != task.id {
                task.id = resolved;
                swapped += 1;
                changed = true;
            }
            let pending = still_pending.contains(&task.id);
            if task.pending != pending {
                task.pending = pending;
                changed = true;
            }
        }

        if changed {
            self.write(project_id, &tasks).await?;
        }
        Ok(swapped)
    }

    async fn read(&self, project_id: i64) -> Result<Vec<Task>> {
        let key = project_key(project_id);
        let raw = self
            .storage
            .get(&key)
            .await
            .with_context(|| format!("Failed to read task cache {}", key))?;
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Task cache {} is corrupted, treating as empty: {}", key, e);
            Vec::new()
        }))
    }

    async fn write(&self, project_id: i64, tasks: &[Task]) -> Result<()> {
        let key = project_key(project_id);
        let json = serde_json::to_string(tasks).context("Failed to serialize task cache")?;
        self.storage
            .set(&key, json)
            .await
            .with_context(|| format!("Failed to write task cache {}", key))
    }
}
