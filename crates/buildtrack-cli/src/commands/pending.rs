use anyhow::Result;
use buildtrack_core::ActionPayload;
use buildtrack_sync::{Config, MemoryRemote};
use colored::Colorize;

pub async fn list(config: &Config) -> Result<()> {
    let queue = super::open_queue(config, MemoryRemote::new()).await?;
    let pending = queue.list_pending().await;

    if pending.is_empty() {
        println!("{}", "No pending changes".green());
        return Ok(());
    }

    println!("{}", format!("{} pending changes", pending.len()).bold());
    println!();
    for (position, action) in pending.iter().enumerate() {
        let summary = match &action.action {
            ActionPayload::CreateTask { temp_id, task } => format!("\"{}\" as {}", task.title, temp_id),
            ActionPayload::UpdateTask { task_id, .. } => format!("task {}", task_id),
            ActionPayload::AddComment { task_id, comment, .. } => {
                format!("on task {}: \"{}\"", task_id, comment.body)
            }
            ActionPayload::UploadDocument { task_id, document, .. } => match task_id {
                Some(task_id) => format!("{} on task {}", document.file_name, task_id),
                None => document.file_name.clone(),
            },
        };

        println!(
            "{:>3}. {} {} [project {}] {}",
            position + 1,
            action.kind().to_string().cyan(),
            summary,
            action.project_id,
            action.enqueued_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }

    Ok(())
}

pub async fn tasks(config: &Config, project_id: i64) -> Result<()> {
    let queue = super::open_queue(config, MemoryRemote::new()).await?;
    let tasks = queue.task_cache().load(project_id).await;

    if tasks.is_empty() {
        println!("{}", format!("No cached tasks for project {}", project_id).yellow());
        return Ok(());
    }

    for task in tasks {
        let marker = if task.pending { "*".yellow().to_string() } else { " ".to_string() };
        println!("{} {:<44} {:<12} {}", marker, task.id.to_string(), task.status.to_string().cyan(), task.title);
    }

    Ok(())
}
