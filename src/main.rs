//! # Doc Answerer CLI (`dqa`)
//!
//! The `dqa` binary talks to an API Doc Answerer backend: it uploads API
//! documents for indexing, asks questions, and browses the answers asked
//! so far.
//!
//! ## Usage
//!
//! ```bash
//! dqa --config ./config/dqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dqa ingest <path>...` | Upload files (or matching files under directories) |
//! | `dqa ask "<question>"` | Ask a question and print the answer, citations and snippets |
//! | `dqa history list` | List past questions |
//! | `dqa history show <id>` | Print a past answer |
//! | `dqa docs list` | List ingested documents |
//! | `dqa docs delete <id>` | Delete an ingested document |
//! | `dqa health` | Check that the backend is up |
//! | `dqa shell` | Interactive session |
//!
//! ## Examples
//!
//! ```bash
//! # Index an OpenAPI document
//! dqa ingest sample_docs/openapi.json
//!
//! # Ask and copy the python snippet to the clipboard
//! dqa ask "How do I create an invoice?" --lang python --copy
//!
//! # Point at another backend for one command
//! DQA_API_BASE=http://10.0.0.5:8000 dqa history list
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doc_answerer::commands::{self, PanelOptions};
use doc_answerer::progress::ProgressMode;
use doc_answerer::{api, config, shell};

/// Doc Answerer CLI: ingest API docs, ask questions, browse answers.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults
/// (backend at `http://localhost:8000`).
#[derive(Parser)]
#[command(
    name = "dqa",
    about = "Doc Answerer: ingest API docs, ask questions, browse answers",
    version,
    long_about = "Client for the API Doc Answerer + Snippet Generator backend. Uploads API \
    documents for indexing, asks natural-language questions, and shows answers with citations \
    and code snippets in several languages."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dqa.toml`. The `DQA_API_BASE` environment
    /// variable overrides `[backend].base_url`.
    #[arg(long, global = true, default_value = "./config/dqa.toml")]
    config: PathBuf,

    /// Progress events on stderr: `auto`, `human`, `json`, or `off`.
    #[arg(long, global = true, default_value = "auto", value_parser = ProgressMode::parse)]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Upload documents for indexing.
    ///
    /// Files are sent as given. Directories are walked and filtered by
    /// `[ingest].include_globs` / `exclude_globs`. All files go in one
    /// multipart request.
    Ingest {
        /// Files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a question.
    ///
    /// Without a question, `[ask].default_question` is asked.
    Ask {
        question: Option<String>,

        /// Snippet tab to show (e.g. `curl`, `python`). Defaults to the first.
        #[arg(long)]
        lang: Option<String>,

        /// Copy the shown snippet to the clipboard (OSC 52).
        #[arg(long)]
        copy: bool,
    },

    /// Browse past questions and answers.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage ingested documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Check backend health.
    Health,

    /// Start an interactive session.
    Shell,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List past questions, newest first.
    List,
    /// Print a past answer by id.
    Show {
        id: String,

        #[arg(long)]
        lang: Option<String>,

        #[arg(long)]
        copy: bool,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List ingested documents.
    List,
    /// Delete a document and its index entries.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;
    let observer = cli.progress.observer();

    match cli.command {
        Commands::Ingest { paths } => {
            commands::run_ingest(&cfg, &paths, observer).await?;
        }
        Commands::Ask {
            question,
            lang,
            copy,
        } => {
            commands::run_ask(&cfg, question, &PanelOptions { lang, copy }, observer).await?;
        }
        Commands::History { action } => match action {
            HistoryAction::List => {
                commands::run_history_list(&cfg, observer).await?;
            }
            HistoryAction::Show { id, lang, copy } => {
                commands::run_history_show(&cfg, &id, &PanelOptions { lang, copy }, observer)
                    .await?;
            }
        },
        Commands::Docs { action } => match action {
            DocsAction::List => {
                commands::run_docs_list(&cfg, observer).await?;
            }
            DocsAction::Delete { id } => {
                commands::run_docs_delete(&cfg, &id, observer).await?;
            }
        },
        Commands::Health => {
            api::run_health(&cfg).await?;
        }
        Commands::Shell => {
            shell::run_shell(&cfg, observer).await?;
        }
    }

    Ok(())
}
