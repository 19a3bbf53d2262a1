// File: buildtrack-sync/src/remote.rs
// Purpose: Remote API seam and the in-memory mock backend

use async_trait::async_trait;
use buildtrack_core::{
    ActionKind, DocumentUpload, EntityRef, NewComment, NewTask, Task, TaskPatch,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Failure reported by the remote system
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Operations the offline queue replays against the server.
///
/// Created entities come back with their server-assigned id.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create_task(&self, project_id: i64, task: &NewTask) -> Result<i64, RemoteError>;

    async fn update_task(&self, task_id: i64, changes: &TaskPatch) -> Result<(), RemoteError>;

    async fn add_comment(&self, task_id: i64, comment: &NewComment) -> Result<i64, RemoteError>;

    async fn upload_document(
        &self,
        project_id: i64,
        task_id: Option<i64>,
        document: &DocumentUpload,
    ) -> Result<i64, RemoteError>;

    /// Current task list of a project, used to refresh offline caches
    async fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>, RemoteError>;
}

/// A call received by [`MemoryRemote`]
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    CreateTask { project_id: i64, title: String },
    UpdateTask { task_id: i64 },
    AddComment { task_id: i64, body: String },
    UploadDocument { project_id: i64, task_id: Option<i64>, file_name: String },
}

#[derive(Debug, Clone)]
pub struct StoredComment {
    pub id: i64,
    pub task_id: i64,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: i64,
    pub project_id: i64,
    pub task_id: Option<i64>,
    pub file_name: String,
}

#[derive(Default)]
struct MemoryRemoteState {
    next_id: i64,
    tasks: BTreeMap<i64, Task>,
    comments: Vec<StoredComment>,
    documents: Vec<StoredDocument>,
    calls: Vec<RemoteCall>,
    failing: HashSet<ActionKind>,
    fail_next: HashMap<ActionKind, usize>,
}

impl MemoryRemoteState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_failure(&mut self, kind: ActionKind) -> Result<(), RemoteError> {
        if self.failing.contains(&kind) {
            return Err(RemoteError::Rejected {
                status: 503,
                message: format!("{} unavailable", kind),
            });
        }
        if let Some(remaining) = self.fail_next.get_mut(&kind) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::Network(format!("{} request timed out", kind)));
            }
        }
        Ok(())
    }
}

/// In-memory stand-in for the BuildTrack server.
///
/// Assigns sequential ids, records every successful call, and can be told to
/// fail specific kinds of request.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryRemoteState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start id allocation after `last_id`
    pub fn with_id_offset(last_id: i64) -> Self {
        let remote = Self::new();
        remote.lock().next_id = last_id;
        remote
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryRemoteState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reject every request of this kind until [`MemoryRemote::recover`]
    pub fn fail_always(&self, kind: ActionKind) {
        self.lock().failing.insert(kind);
    }

    /// Reject the next `count` requests of this kind
    pub fn fail_next(&self, kind: ActionKind, count: usize) {
        self.lock().fail_next.insert(kind, count);
    }

    pub fn recover(&self, kind: ActionKind) {
        let mut state = self.lock();
        state.failing.remove(&kind);
        state.fail_next.remove(&kind);
    }

    /// Insert a task as if it had been created server-side
    pub fn seed_task(&self, project_id: i64, task: NewTask) -> i64 {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.tasks.insert(id, task_record(id, project_id, &task));
        id
    }

    /// Insert a task that already carries a server id, e.g. one read back
    /// from a local cache. Later ids are allocated above it.
    pub fn insert_task(&self, task: Task) -> Option<i64> {
        let id = task.id.server_id()?;
        let mut state = self.lock();
        state.next_id = state.next_id.max(id);
        state.tasks.insert(id, Task { pending: false, ..task });
        Some(id)
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn task(&self, id: i64) -> Option<Task> {
        self.lock().tasks.get(&id).cloned()
    }

    pub fn comments(&self) -> Vec<StoredComment> {
        self.lock().comments.clone()
    }

    pub fn documents(&self) -> Vec<StoredDocument> {
        self.lock().documents.clone()
    }
}

fn task_record(id: i64, project_id: i64, task: &NewTask) -> Task {
    Task {
        id: EntityRef::Server(id),
        project_id,
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status,
        assignee_id: task.assignee_id,
        due_date: task.due_date,
        updated_at: Utc::now(),
        pending: false,
    }
}

#[async_trait]
impl RemoteApi for MemoryRemote {
    async fn create_task(&self, project_id: i64, task: &NewTask) -> Result<i64, RemoteError> {
        let mut state = self.lock();
        state.check_failure(ActionKind::CreateTask)?;

        let id = state.allocate_id();
        state.tasks.insert(id, task_record(id, project_id, task));
        state.calls.push(RemoteCall::CreateTask {
            project_id,
            title: task.title.clone(),
        });
        Ok(id)
    }

    async fn update_task(&self, task_id: i64, changes: &TaskPatch) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.check_failure(ActionKind::UpdateTask)?;

        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(RemoteError::NotFound { entity: "task", id: task_id })?;

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
        task.updated_at = Utc::now();

        state.calls.push(RemoteCall::UpdateTask { task_id });
        Ok(())
    }

    async fn add_comment(&self, task_id: i64, comment: &NewComment) -> Result<i64, RemoteError> {
        let mut state = self.lock();
        state.check_failure(ActionKind::AddComment)?;

        if !state.tasks.contains_key(&task_id) {
            return Err(RemoteError::NotFound { entity: "task", id: task_id });
        }

        let id = state.allocate_id();
        state.comments.push(StoredComment {
            id,
            task_id,
            body: comment.body.clone(),
        });
        state.calls.push(RemoteCall::AddComment {
            task_id,
            body: comment.body.clone(),
        });
        Ok(id)
    }

    async fn upload_document(
        &self,
        project_id: i64,
        task_id: Option<i64>,
        document: &DocumentUpload,
    ) -> Result<i64, RemoteError> {
        let mut state = self.lock();
        state.check_failure(ActionKind::UploadDocument)?;

        if let Some(task_id) = task_id {
            if !state.tasks.contains_key(&task_id) {
                return Err(RemoteError::NotFound { entity: "task", id: task_id });
            }
        }

        let id = state.allocate_id();
        state.documents.push(StoredDocument {
            id,
            project_id,
            task_id,
            file_name: document.file_name.clone(),
        });
        state.calls.push(RemoteCall::UploadDocument {
            project_id,
            task_id,
            file_name: document.file_name.clone(),
        });
        Ok(id)
    }

    async fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>, RemoteError> {
        let state = self.lock();
        Ok(state
            .tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect())
    }
}
