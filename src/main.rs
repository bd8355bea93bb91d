use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tempo::backend;
use tempo::cli;
use tempo::config::TempoConfig;
use tempo::server;

#[derive(Parser)]
#[command(name = "tempo", version, about = "Personal work-logging server and client")]
struct Cli {
    /// Path to the config file (defaults to ~/.tempo/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the tempo server
    Serve,
    /// Administrate the storage backend
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Administrate projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Administrate event actions
    Action {
        #[command(subcommand)]
        command: ActionCommand,
    },
    /// Record and amend worklog entries
    Worklog {
        #[command(subcommand)]
        command: WorklogCommand,
    },
    /// Annotate a project with a description or an external ticket key
    Annotate {
        /// Project id
        project: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        key: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCommand {
    /// Create the persisted layout (idempotent)
    Init,
    /// Drop the persisted layout (idempotent)
    Drop,
    /// Physically delete soft-deleted rows
    Prune,
    /// Delete all rows without dropping the layout
    Truncate,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Add project(s)
    Add { names: Vec<String> },
    /// List projects
    List,
    /// Export projects as JSON
    Export,
    /// Soft-delete project(s) by id
    Remove { ids: Vec<String> },
}

#[derive(Subcommand)]
enum ActionCommand {
    /// Add action(s)
    Add { names: Vec<String> },
    /// List actions
    List,
    /// Export actions as JSON
    Export,
    /// Soft-delete action(s) by id
    Remove { ids: Vec<String> },
}

#[derive(Subcommand)]
enum WorklogCommand {
    /// Record a worklog event
    Add {
        /// Project id
        #[arg(short, long)]
        project: String,
        /// Action id
        #[arg(short, long)]
        action: String,
        /// Ticket key to attach (e.g. ALPHA-42)
        #[arg(short = 'k', long)]
        ticket: Option<String>,
    },
    /// Shift the last entry's timestamp, e.g. +30m or -2h
    Amend { modifier: String },
    /// Remove the last entry
    Remove,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => TempoConfig::load_from(path)?,
        None => TempoConfig::load()?,
    };

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for the stdout storage backend.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve(config).await?;
        }
        Command::Db { command } => {
            let mut backend = backend::create_backend(&config)?;
            match command {
                DbCommand::Init => backend.init_schema()?,
                DbCommand::Drop => backend.drop_schema()?,
                DbCommand::Prune => backend.prune_deleted()?,
                DbCommand::Truncate => backend.truncate()?,
            }
        }
        Command::Project { command } => match command {
            ProjectCommand::Add { names } => cli::project_add(&config, &names).await?,
            ProjectCommand::List => cli::project_list(&config).await?,
            ProjectCommand::Export => cli::project_export(&config).await?,
            ProjectCommand::Remove { ids } => cli::project_remove(&config, &ids).await?,
        },
        Command::Action { command } => match command {
            ActionCommand::Add { names } => cli::action_add(&config, &names).await?,
            ActionCommand::List => cli::action_list(&config).await?,
            ActionCommand::Export => cli::action_export(&config).await?,
            ActionCommand::Remove { ids } => cli::action_remove(&config, &ids).await?,
        },
        Command::Worklog { command } => match command {
            WorklogCommand::Add {
                project,
                action,
                ticket,
            } => cli::worklog_add(&config, &project, &action, ticket.as_deref()).await?,
            WorklogCommand::Amend { modifier } => cli::worklog_amend(&config, &modifier).await?,
            WorklogCommand::Remove => cli::worklog_remove(&config).await?,
        },
        Command::Annotate {
            project,
            description,
            key,
        } => {
            cli::annotate(&config, &project, description.as_deref(), key.as_deref()).await?;
        }
    }

    Ok(())
}
