mod commands;

use anyhow::Result;
use buildtrack_core::{ActionKind, EntityRef, Permission, Role, TaskStatus};
use buildtrack_sync::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "buildtrack")]
#[command(version, about = "BuildTrack CLI - offline change queue and access checks", long_about = None)]
struct Cli {
    /// Config file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "buildtrack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a change for the next sync
    Enqueue {
        #[command(subcommand)]
        action: EnqueueCommands,
    },

    /// List queued changes in replay order
    Pending,

    /// Show the cached task list of a project
    Tasks {
        #[arg(short, long)]
        project: i64,
    },

    /// Replay queued changes against the mock backend
    Sync {
        /// Make the backend reject this kind of request (repeatable)
        #[arg(long, value_enum)]
        fail: Vec<FailKind>,

        /// Pretend the network is down
        #[arg(long)]
        offline: bool,
    },

    /// Check whether a role holds a permission
    Can {
        #[arg(short, long)]
        role: Role,

        #[arg(short, long)]
        permission: Permission,
    },

    /// List every role with its permissions
    Roles,
}

#[derive(Subcommand)]
enum EnqueueCommands {
    /// Create a task
    Task {
        #[arg(short, long)]
        project: i64,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        assignee: Option<i64>,
    },

    /// Update a task (server id or tmp- id)
    Update {
        #[arg(short, long)]
        project: i64,

        #[arg(long)]
        task: EntityRef,

        #[arg(short, long)]
        status: Option<TaskStatus>,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        assignee: Option<i64>,
    },

    /// Comment on a task
    Comment {
        #[arg(short, long)]
        project: i64,

        #[arg(long)]
        task: EntityRef,

        #[arg(short, long)]
        body: String,

        #[arg(short, long)]
        author: Option<i64>,
    },

    /// Upload a document, optionally attached to a task
    Upload {
        #[arg(short, long)]
        project: i64,

        #[arg(long)]
        task: Option<EntityRef>,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        size: u64,

        #[arg(long)]
        content_type: Option<String>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FailKind {
    /// Task creation
    Create,
    /// Task updates
    Update,
    /// Comments
    Comment,
    /// Document uploads
    Upload,
}

impl From<FailKind> for ActionKind {
    fn from(kind: FailKind) -> Self {
        match kind {
            FailKind::Create => ActionKind::CreateTask,
            FailKind::Update => ActionKind::UpdateTask,
            FailKind::Comment => ActionKind::AddComment,
            FailKind::Upload => ActionKind::UploadDocument,
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    init_tracing(&config.logging.level);

    // Execute command
    match cli.command {
        Commands::Enqueue { action } => {
            commands::enqueue::execute(&config, action).await?;
        }
        Commands::Pending => {
            commands::pending::list(&config).await?;
        }
        Commands::Tasks { project } => {
            commands::pending::tasks(&config, project).await?;
        }
        Commands::Sync { fail, offline } => {
            let failing: Vec<ActionKind> = fail.into_iter().map(ActionKind::from).collect();
            commands::sync::execute(&config, &failing, offline).await?;
        }
        Commands::Can { role, permission } => {
            commands::access::can(role, permission);
        }
        Commands::Roles => {
            commands::access::roles();
        }
    }

    Ok(())
}
