// File: buildtrack-core/src/action.rs
// Purpose: Mutations queued while offline, one payload shape per kind

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{EntityRef, TemporaryId};
use crate::task::TaskStatus;

/// Kind of a queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateTask,
    UpdateTask,
    UploadDocument,
    AddComment,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::CreateTask => write!(f, "create_task"),
            ActionKind::UpdateTask => write!(f, "update_task"),
            ActionKind::UploadDocument => write!(f, "upload_document"),
            ActionKind::AddComment => write!(f, "add_comment"),
        }
    }
}

/// Fields of a task being created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            assignee_id: None,
            due_date: None,
        }
    }
}

/// Partial update to an existing task; `None` leaves a field untouched
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
            && self.due_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub body: String,
    #[serde(default)]
    pub author_id: Option<i64>,
}

/// Document metadata captured at upload time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub size_bytes: u64,
    /// Where the client keeps the bytes until the upload goes through
    #[serde(default)]
    pub local_path: Option<String>,
}

/// Payload of a queued mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    CreateTask {
        temp_id: TemporaryId,
        task: NewTask,
    },
    UpdateTask {
        task_id: EntityRef,
        changes: TaskPatch,
    },
    AddComment {
        task_id: EntityRef,
        comment: NewComment,
        #[serde(default)]
        temp_id: Option<TemporaryId>,
    },
    UploadDocument {
        #[serde(default)]
        task_id: Option<EntityRef>,
        document: DocumentUpload,
        #[serde(default)]
        temp_id: Option<TemporaryId>,
    },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::CreateTask { .. } => ActionKind::CreateTask,
            ActionPayload::UpdateTask { .. } => ActionKind::UpdateTask,
            ActionPayload::AddComment { .. } => ActionKind::AddComment,
            ActionPayload::UploadDocument { .. } => ActionKind::UploadDocument,
        }
    }

    /// Temporary id of the entity this action creates, if any
    pub fn created_temp_id(&self) -> Option<&TemporaryId> {
        match self {
            ActionPayload::CreateTask { temp_id, .. } => Some(temp_id),
            ActionPayload::AddComment { temp_id, .. } => temp_id.as_ref(),
            ActionPayload::UploadDocument { temp_id, .. } => temp_id.as_ref(),
            ActionPayload::UpdateTask { .. } => None,
        }
    }

    /// Task this action targets, if any
    pub fn task_ref(&self) -> Option<&EntityRef> {
        match self {
            ActionPayload::CreateTask { .. } => None,
            ActionPayload::UpdateTask { task_id, .. } => Some(task_id),
            ActionPayload::AddComment { task_id, .. } => Some(task_id),
            ActionPayload::UploadDocument { task_id, .. } => task_id.as_ref(),
        }
    }

    /// Replace temporary references that `lookup` can resolve.
    ///
    /// Returns how many references were rewritten.
    pub fn rewrite_refs<F>(&mut self, lookup: F) -> usize
    where
        F: Fn(&TemporaryId) -> Option<i64>,
    {
        let target = match self {
            ActionPayload::CreateTask { .. } => None,
            ActionPayload::UpdateTask { task_id, .. } => Some(task_id),
            ActionPayload::AddComment { task_id, .. } => Some(task_id),
            ActionPayload::UploadDocument { task_id, .. } => task_id.as_mut(),
        };

        match target {
            Some(entity) => {
                let resolved = entity.temporary_id().and_then(&lookup);
                match resolved {
                    Some(id) => {
                        *entity = EntityRef::Server(id);
                        1
                    }
                    None => 0,
                }
            }
            None => 0,
        }
    }
}

/// A mutation waiting to be applied remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: Uuid,
    pub project_id: i64,
    pub action: ActionPayload,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(project_id: i64, action: ActionPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            action,
            enqueued_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_payload_is_tagged_by_type() {
        let tmp = TemporaryId::new();
        let action = ActionPayload::CreateTask {
            temp_id: tmp.clone(),
            task: NewTask::new("Install rebar"),
        };

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "create_task");
        assert_eq!(value["temp_id"], tmp.as_str());
        assert_eq!(value["task"]["title"], "Install rebar");
    }

    #[test]
    fn test_rewrite_refs_only_touches_known_temporaries() {
        let known = TemporaryId::new();
        let unknown = TemporaryId::new();
        let lookup = |tmp: &TemporaryId| if *tmp == known { Some(99) } else { None };

        let mut comment = ActionPayload::AddComment {
            task_id: known.clone().into(),
            comment: NewComment { body: "Checked".into(), author_id: None },
            temp_id: None,
        };
        assert_eq!(comment.rewrite_refs(lookup), 1);
        assert_eq!(comment.task_ref(), Some(&EntityRef::Server(99)));

        let mut update = ActionPayload::UpdateTask {
            task_id: unknown.clone().into(),
            changes: TaskPatch::default(),
        };
        assert_eq!(update.rewrite_refs(lookup), 0);
        assert_eq!(update.task_ref(), Some(&EntityRef::Temporary(unknown)));

        let mut upload = ActionPayload::UploadDocument {
            task_id: None,
            document: DocumentUpload {
                file_name: "plan.pdf".into(),
                content_type: None,
                size_bytes: 10,
                local_path: None,
            },
            temp_id: None,
        };
        assert_eq!(upload.rewrite_refs(lookup), 0);
    }

    #[test]
    fn test_pending_action_round_trip_keeps_order_fields() {
        let pending = PendingAction::new(
            5,
            ActionPayload::UpdateTask {
                task_id: EntityRef::Server(12),
                changes: TaskPatch { status: Some(TaskStatus::Done), ..Default::default() },
            },
        );

        let json = serde_json::to_string(&pending).unwrap();
        let back: PendingAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pending);
        assert_eq!(back.kind(), ActionKind::UpdateTask);
    }
}
