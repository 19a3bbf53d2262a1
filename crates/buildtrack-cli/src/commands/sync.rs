use anyhow::Result;
use buildtrack_core::ActionKind;
use buildtrack_sync::{Config, MemoryRemote, SyncOutcome};
use colored::Colorize;

/// Replay the queue against a mock backend seeded from the task caches
pub async fn execute(config: &Config, failing: &[ActionKind], offline: bool) -> Result<()> {
    let remote = MemoryRemote::new();
    let queue = super::open_queue(config, remote.clone()).await?;
    queue.network().set_online(!offline);

    let projects = queue.task_cache().cached_projects().await?;
    for &project_id in &projects {
        for task in queue.task_cache().load(project_id).await {
            remote.insert_task(task);
        }
    }
    for &kind in failing {
        remote.fail_always(kind);
    }

    println!("{}", "Syncing pending changes...".green().bold());
    let outcome = queue.try_sync().await;

    if outcome.ran() {
        for &project_id in &projects {
            if let Err(e) = queue.task_cache().refresh_from(&remote, project_id).await {
                tracing::warn!("Could not refresh project {}: {:#}", project_id, e);
            }
        }
    }

    let notice = outcome.notice();
    match outcome {
        SyncOutcome::Synced { .. } | SyncOutcome::NoOp => println!("{}", notice.green()),
        SyncOutcome::Partial { .. } | SyncOutcome::Offline | SyncOutcome::Skipped => {
            println!("{}", notice.yellow())
        }
    }

    let remaining = queue.pending_count().await;
    if remaining > 0 {
        println!("Still pending: {}", remaining);
    }

    Ok(())
}
