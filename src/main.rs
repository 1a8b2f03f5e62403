//! # DocQ CLI (`docq`)
//!
//! The `docq` binary is the terminal interface to a document
//! question-answering backend: accounts and sign-in, projects, knowledge
//! base uploads, background processing, and cited chat.
//!
//! ## Usage
//!
//! ```bash
//! docq --config ./config/docq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docq login` | Sign in and persist the bearer token |
//! | `docq signup` | Create an account |
//! | `docq logout` | Drop the persisted token |
//! | `docq health` | Backend health report (`--watch` polls until healthy) |
//! | `docq project list\|create\|rename\|delete` | Manage projects |
//! | `docq docs list\|upload\|delete\|chunks` | Manage a project's knowledge base |
//! | `docq process start\|status\|watch` | Drive and observe processing |
//! | `docq chat send\|history` | Converse with the assistant |
//!
//! ## Examples
//!
//! ```bash
//! docq login --username ada --password s3cret
//! docq project create "Docs"
//! docq docs upload 7f3a… intro.pdf appendix.pdf
//! docq process start 7f3a… --watch
//! docq chat send 7f3a… "What does the appendix say about X?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docq::progress::ProgressMode;
use docq::{config, documents, health, messages, projects, session, task};

/// DocQ CLI — an async client for document question-answering backends.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docq.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docq",
    about = "DocQ — client and CLI for document question-answering (RAG) backends",
    version,
    long_about = "DocQ manages projects, uploads documents into per-project knowledge bases, \
    drives the backend's chunk/embed/store processing pipeline, and converses with an assistant \
    that cites source passages."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docq.toml`. API address, token location, and
    /// polling intervals are read from this file.
    #[arg(long, global = true, default_value = "./config/docq.toml")]
    config: PathBuf,

    /// Progress output for watch modes: `off`, `human`, or `json`.
    /// Defaults to `human` when stderr is a TTY, otherwise `off`.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the bearer token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account.
    ///
    /// Validation failures are reported per field (e.g. an already-taken
    /// username or a malformed email).
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Drop the persisted token.
    Logout,

    /// Backend health report.
    Health {
        /// Keep polling until the backend reports healthy.
        #[arg(long)]
        watch: bool,
    },

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage a project's knowledge base documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Drive and observe a project's processing pipeline.
    Process {
        #[command(subcommand)]
        action: ProcessAction,
    },

    /// Converse with the assistant over a project's knowledge base.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

/// Project management subcommands.
#[derive(Subcommand)]
enum ProjectAction {
    /// List projects with their status.
    List,
    /// Create a project.
    Create { name: String },
    /// Rename a project.
    Rename { id: String, name: String },
    /// Delete a project. Its documents and messages cascade.
    Delete { id: String },
}

/// Document management subcommands.
#[derive(Subcommand)]
enum DocsAction {
    /// List a project's documents.
    List { project: String },
    /// Upload files into a project's knowledge base (one multipart batch).
    Upload {
        project: String,
        /// Files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove one document. Removing the last one empties the knowledge
    /// base and resets the project to created.
    Delete { project: String, id: String },
    /// List the chunks of a processed document.
    Chunks { project: String, document: String },
}

/// Processing subcommands.
#[derive(Subcommand)]
enum ProcessAction {
    /// Start the chunk → embed → store pipeline for uploaded documents.
    Start {
        project: String,
        /// Poll the task and show stage progress until it finishes.
        #[arg(long)]
        watch: bool,
        /// Drive a fixed local five-stage timeline instead of the backend
        /// task (for backends without task state, and demos).
        #[arg(long)]
        simulate: bool,
    },
    /// Show the current task status.
    Status { project: String },
    /// Attach to a running task and show stage progress until it finishes.
    Watch { project: String },
}

/// Chat subcommands.
#[derive(Subcommand)]
enum ChatAction {
    /// Send a question and print the assistant's cited answer.
    Send { project: String, message: String },
    /// Print the full conversation.
    History { project: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mode = match cli.progress.as_deref() {
        Some(s) => ProgressMode::parse(s)
            .ok_or_else(|| anyhow::anyhow!("invalid --progress '{}': use off, human, or json", s))?,
        None => ProgressMode::default_for_tty(),
    };

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Login { username, password } => {
            session::run_login(&cfg, &username, &password).await?;
        }
        Commands::Signup {
            name,
            username,
            email,
            password,
        } => {
            session::run_signup(&cfg, &name, &username, &email, &password).await?;
        }
        Commands::Logout => {
            session::run_logout(&cfg).await?;
        }
        Commands::Health { watch } => {
            health::run_health(&cfg, watch).await?;
        }
        Commands::Project { action } => match action {
            ProjectAction::List => projects::run_list(&cfg).await?,
            ProjectAction::Create { name } => projects::run_create(&cfg, &name).await?,
            ProjectAction::Rename { id, name } => projects::run_rename(&cfg, &id, &name).await?,
            ProjectAction::Delete { id } => projects::run_delete(&cfg, &id).await?,
        },
        Commands::Docs { action } => match action {
            DocsAction::List { project } => documents::run_list(&cfg, &project).await?,
            DocsAction::Upload { project, files } => {
                documents::run_upload(&cfg, &project, &files).await?
            }
            DocsAction::Delete { project, id } => {
                documents::run_delete(&cfg, &project, &id).await?
            }
            DocsAction::Chunks { project, document } => {
                documents::run_chunks(&cfg, &project, &document).await?
            }
        },
        Commands::Process { action } => match action {
            ProcessAction::Start {
                project,
                watch,
                simulate,
            } => task::run_start(&cfg, &project, watch, simulate, mode).await?,
            ProcessAction::Status { project } => task::run_status(&cfg, &project).await?,
            ProcessAction::Watch { project } => task::run_watch(&cfg, &project, mode).await?,
        },
        Commands::Chat { action } => match action {
            ChatAction::Send { project, message } => {
                messages::run_send(&cfg, &project, &message).await?
            }
            ChatAction::History { project } => messages::run_history(&cfg, &project).await?,
        },
    }

    Ok(())
}
