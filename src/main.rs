//! # Kira CLI (`kira`)
//!
//! ## Usage
//!
//! ```bash
//! kira --config ./config/kira.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kira serve` | Start the HTTP JSON API |
//! | `kira chat` | Chat with Kira in the terminal |
//! | `kira ingest <path>` | Load and chunk a document, print counts |
//! | `kira completions <shell>` | Print a shell completion script |
//!
//! `serve` and `chat` need `OPENAI_API_KEY` in the environment.
//!
//! ## Examples
//!
//! ```bash
//! # Chat with a syllabus loaded
//! kira chat --file ./plan_de_estudios.pdf
//!
//! # Check how a spreadsheet is chunked
//! kira ingest ./horarios.xlsx
//!
//! # Serve the API
//! RUST_LOG=kira=debug kira serve
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};

use kira::assistant::Assistant;
use kira::config::{self, Config};
use kira::{chat_cmd, ingest_cmd, server};

/// Kira — a document-grounded study assistant for Universidad de La Sabana.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kira.toml` for the shipped defaults.
#[derive(Parser)]
#[command(
    name = "kira",
    about = "Kira — a document-grounded study assistant",
    version,
    long_about = "Kira answers questions about uploaded documents (pdf, docx, txt, csv, xlsx) \
    by combining a retrieval-grounded answer with a conversational one, over a JSON HTTP API \
    or an interactive terminal chat."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kira.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP JSON API on `[server].bind`.
    Serve,

    /// Chat in the terminal.
    ///
    /// Files passed with `--file` are ingested before the first message.
    /// Type `/quit` to leave.
    Chat {
        /// Document to ingest at start (repeatable).
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },

    /// Load and chunk a document without embedding it.
    Ingest {
        /// Path to a pdf, docx, txt, csv or xlsx file.
        path: PathBuf,
    },

    /// Print a shell completion script to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_assistant(cfg: &Config) -> anyhow::Result<Arc<Assistant>> {
    let api_key = config::require_api_key()?;
    Ok(Arc::new(Assistant::with_openai(cfg, &api_key)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "kira", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();

    let cfg = config::load_config(&cli.config)?;
    tracing::debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Serve => {
            let assistant = build_assistant(&cfg)?;
            server::run_server(&cfg, assistant).await?;
        }
        Commands::Chat { files } => {
            let assistant = build_assistant(&cfg)?;
            let session = assistant.create_session().await;
            let mut stdout = std::io::stdout();

            chat_cmd::print_banner(&mut stdout)?;
            for path in &files {
                chat_cmd::upload_file(&assistant, &session, path, &mut stdout).await?;
            }

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let interactive = atty::is(atty::Stream::Stdin);
            chat_cmd::run_chat(&assistant, &session, stdin, &mut stdout, interactive).await?;
        }
        Commands::Ingest { path } => {
            ingest_cmd::run_ingest(&cfg, &path)?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
