//! # Docket CLI (`docket`)
//!
//! The `docket` binary is the primary interface for Docket. It provides
//! commands for database initialization, document ingestion, listing,
//! question answering, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docket --config ./config/docket.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docket init` | Create the SQLite database and run schema migrations |
//! | `docket ingest` | Ingest one stored file into a group's corpus |
//! | `docket documents` | List a group's documents and their statuses |
//! | `docket ask` | Answer a question from a group's corpus |
//! | `docket serve` | Start the HTTP API with background ingestion workers |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docket::{answer, config, db, ingest, migrate, server};

/// Docket — group-scoped document ingestion and retrieval-augmented
/// question answering.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docket.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docket",
    about = "Docket — group-scoped document ingestion and retrieval-augmented question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docket.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents/chunks tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest one already-stored file into a group's corpus.
    ///
    /// Runs the full pipeline in the foreground (extract, chunk, embed,
    /// store) and prints a summary. Requires an embedding provider.
    Ingest {
        /// Owning group identifier.
        #[arg(long)]
        group: String,

        /// Path to the stored file.
        #[arg(long)]
        file: PathBuf,

        /// Content type of the file: text/plain, text/markdown,
        /// application/pdf, or DOCX.
        #[arg(long)]
        content_type: String,

        /// Uploader identifier recorded on the document.
        #[arg(long, default_value = "cli")]
        uploader: String,
    },

    /// List a group's documents and their processing statuses.
    Documents {
        /// Group identifier.
        #[arg(long)]
        group: String,
    },

    /// Answer a question from a group's corpus.
    ///
    /// Embeds the question, retrieves the nearest chunks for the group,
    /// and prints the grounded answer. Requires embedding and generation
    /// providers.
    Ask {
        /// Group identifier.
        #[arg(long)]
        group: String,

        /// The question to answer.
        question: String,
    },

    /// Start the HTTP API server.
    ///
    /// Serves document registration, listing, and question answering, with
    /// ingestion running on background workers.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            group,
            file,
            content_type,
            uploader,
        } => {
            ingest::run_ingest(&cfg, &group, &file, &content_type, &uploader).await?;
        }
        Commands::Documents { group } => {
            ingest::run_documents(&cfg, &group).await?;
        }
        Commands::Ask { group, question } => {
            answer::run_ask(&cfg, &group, &question).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
