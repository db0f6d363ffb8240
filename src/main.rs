//! # RAG Assistant CLI (`rag`)
//!
//! Ingest documents into a remote RAG service and talk to it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag health` | Probe the server's health endpoint |
//! | `rag upload <files>...` | Index one or more PDFs |
//! | `rag paste --title <t>` | Submit pasted text content |
//! | `rag ask "<question>"` | Ask one question |
//! | `rag chat` | Interactive session |
//!
//! ## Examples
//!
//! ```bash
//! rag --server http://localhost:3000 health
//! rag upload docs/*.pdf --progress json
//! rag paste --title "Release notes" --file notes.txt
//! rag ask "What changed in 2.0?" --json
//! ```

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rag_assistant::backend::{HttpBackend, RagBackend};
use rag_assistant::config::{self, Config};
use rag_assistant::health::HealthStatus;
use rag_assistant::ingest::PendingFile;
use rag_assistant::progress::ProgressMode;
use rag_assistant::render::{render_items, render_message};
use rag_assistant::session::Session;
use rag_assistant::shell;

/// RAG Assistant: ingest documents into a RAG service and chat about them.
///
/// All commands accept `--config` pointing to a TOML configuration file.
/// See `config/rag.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "rag", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used when it does not exist.
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    /// Base URL of the RAG server, overriding `server.base_url`.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the RAG server is reachable.
    Health,

    /// Upload PDF files for indexing.
    ///
    /// Files are submitted one at a time in the given order. A failed file
    /// does not stop the rest of the batch.
    Upload {
        /// PDF files to index.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Progress output on stderr. Defaults to human when stderr is a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Print the final item states as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Submit pasted text content.
    ///
    /// Reads the content from `--content`, `--file`, or stdin.
    Paste {
        /// Title for the content.
        #[arg(long)]
        title: String,

        /// Content text.
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Read content from a text file.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Ask a single question about the indexed documents.
    Ask {
        /// The question.
        query: String,

        /// Print the transcript entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive session.
    Chat,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = config::load_or_default(&cli.config)?;
    if let Some(server) = cli.server {
        cfg.server.base_url = server;
        config::validate(&cfg)?;
    }

    let backend: Arc<dyn RagBackend> = Arc::new(
        HttpBackend::new(&cfg.server).context("Failed to build HTTP client")?,
    );

    match cli.command {
        Commands::Health => run_health(&cfg, backend).await?,
        Commands::Upload {
            files,
            progress,
            json,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            run_upload(&cfg, backend, files, mode, json).await?;
        }
        Commands::Paste {
            title,
            content,
            file,
        } => {
            let content = match (content, file) {
                (Some(c), _) => c,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
                    buf
                }
            };
            run_paste(&cfg, backend, &title, &content).await?;
        }
        Commands::Ask { query, json } => run_ask(&cfg, backend, &query, json).await?,
        Commands::Chat => shell::run_chat(&cfg, backend).await?,
    }

    Ok(())
}

async fn connected_session(cfg: &Config, backend: Arc<dyn RagBackend>) -> Result<Session> {
    let session = Session::new(cfg, backend);
    if session.check_connection().await != HealthStatus::Connected {
        bail!(
            "Cannot connect to RAG API server at {}",
            cfg.server.base_url
        );
    }
    Ok(session)
}

async fn run_health(cfg: &Config, backend: Arc<dyn RagBackend>) -> Result<()> {
    let session = Session::new(cfg, backend);
    let status = session.check_connection().await;
    println!("{}  {}", status, cfg.server.base_url);
    if !status.is_connected() {
        bail!("RAG API server is not reachable");
    }
    Ok(())
}

async fn run_upload(
    cfg: &Config,
    backend: Arc<dyn RagBackend>,
    paths: Vec<PathBuf>,
    mode: ProgressMode,
    json: bool,
) -> Result<()> {
    let mut session = connected_session(cfg, backend).await?;

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(
            PendingFile::from_path(path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        );
    }
    if session.enqueue_files(files).is_empty() {
        bail!("No PDF files to upload");
    }

    let report = session.index_files(mode.reporter().as_ref()).await?;
    let views = session.pipeline().views();
    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        print!("{}", render_items(&views));
        println!("{}", session.status());
    }

    if report.failed() > 0 {
        bail!("{} of {} file(s) failed to index", report.failed(), views.len());
    }
    Ok(())
}

async fn run_paste(
    cfg: &Config,
    backend: Arc<dyn RagBackend>,
    title: &str,
    content: &str,
) -> Result<()> {
    let mut session = connected_session(cfg, backend).await?;
    let result = session.submit_text(title, content).await?;
    println!("{}", session.status());
    if let Some(preview) = result.preview {
        println!("  preview: {}", preview);
    }
    Ok(())
}

async fn run_ask(cfg: &Config, backend: Arc<dyn RagBackend>, query: &str, json: bool) -> Result<()> {
    let session = connected_session(cfg, backend).await?;
    let outcome = session.ask(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&session.transcript())?);
    } else if let Ok(reply) = &outcome {
        print!("{}", render_message(reply));
    }

    outcome?;
    Ok(())
}
