use anyhow::Result;
use buildtrack_core::{ActionPayload, DocumentUpload, NewComment, NewTask, TaskPatch, TemporaryId};
use buildtrack_sync::{Config, MemoryRemote};
use colored::Colorize;

use crate::EnqueueCommands;

pub async fn execute(config: &Config, command: EnqueueCommands) -> Result<()> {
    let (project_id, action) = build_action(command);
    if let ActionPayload::UpdateTask { changes, .. } = &action {
        if changes.is_empty() {
            println!("{}", "Nothing to update: pass --status, --title or --assignee".yellow());
            return Ok(());
        }
    }

    let queue = super::open_queue(config, MemoryRemote::new()).await?;
    let pending = queue.enqueue(project_id, action).await?;

    println!("{} {} for project {}", "Queued".green().bold(), pending.kind(), project_id);
    if let Some(temp_id) = pending.action.created_temp_id() {
        println!("Temporary id: {}", temp_id.to_string().cyan());
    }
    println!("Pending changes: {}", queue.pending_count().await);

    Ok(())
}

fn build_action(command: EnqueueCommands) -> (i64, ActionPayload) {
    match command {
        EnqueueCommands::Task { project, title, description, assignee } => {
            let task = NewTask {
                description,
                assignee_id: assignee,
                ..NewTask::new(title)
            };
            (project, ActionPayload::CreateTask { temp_id: TemporaryId::new(), task })
        }
        EnqueueCommands::Update { project, task, status, title, assignee } => {
            let changes = TaskPatch {
                title,
                status,
                assignee_id: assignee,
                ..Default::default()
            };
            (project, ActionPayload::UpdateTask { task_id: task, changes })
        }
        EnqueueCommands::Comment { project, task, body, author } => (
            project,
            ActionPayload::AddComment {
                task_id: task,
                comment: NewComment { body, author_id: author },
                temp_id: Some(TemporaryId::new()),
            },
        ),
        EnqueueCommands::Upload { project, task, name, size, content_type } => (
            project,
            ActionPayload::UploadDocument {
                task_id: task,
                document: DocumentUpload {
                    file_name: name,
                    content_type,
                    size_bytes: size,
                    local_path: None,
                },
                temp_id: Some(TemporaryId::new()),
            },
        ),
    }
}
