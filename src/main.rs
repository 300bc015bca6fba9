//! # Case Context CLI (`casectx`)
//!
//! ## Usage
//!
//! ```bash
//! casectx --config ./config/casectx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `casectx scan` | List corpus documents and skipped files |
//! | `casectx search "<query>"` | Ranked relevant documents |
//! | `casectx context "<query>"` | Print the assembled context |
//! | `casectx stats` | Corpus overview by category and encoding |
//! | `casectx serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # What would the prompt composer receive?
//! casectx context "数据库连接超时问题" --budget 4000
//!
//! # Why did a document rank where it did?
//! casectx search "connection pool exhausted" --explain
//!
//! # Inspect another reference folder without editing the config
//! casectx stats --root ./other_references
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use case_context::config::{self, Config};
use case_context::retrieve::Retriever;
use case_context::{context, search, server, stats, telemetry};

/// Case Context — historical-reference retrieval and context assembly.
///
/// Commands that need a corpus accept `--root`; otherwise `[corpus].root`
/// from the config file is used. When the config file does not exist,
/// built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "casectx",
    about = "Case Context — select and pack relevant historical references into a prompt context",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/casectx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a reference folder and list what was loaded.
    Scan {
        /// Corpus root (overrides `[corpus].root`).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// List the documents most relevant to a query.
    Search {
        query: String,

        #[arg(long)]
        root: Option<PathBuf>,

        /// Maximum number of results (defaults to `[retrieval].search_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Show shared keywords and the category match per result.
        #[arg(long)]
        explain: bool,
    },

    /// Assemble and print the context for a query.
    Context {
        query: String,

        #[arg(long)]
        root: Option<PathBuf>,

        /// Context budget in characters (defaults to `[retrieval].budget`).
        #[arg(long)]
        budget: Option<usize>,

        /// Print entries and metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show corpus statistics.
    Stats {
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Start the JSON HTTP server.
    Serve,
}

fn load(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        info!(config = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cli = Cli::parse();
    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Scan { root } => {
            let root = root.unwrap_or_else(|| cfg.corpus.root.clone());
            let retriever = Retriever::from_config(&cfg)?;
            let snapshot = retriever.cache().get_snapshot(&root)?;
            stats::print_scan(&snapshot);
        }
        Commands::Search {
            query,
            root,
            limit,
            explain,
        } => {
            let root = root.unwrap_or_else(|| cfg.corpus.root.clone());
            let limit = limit.unwrap_or(cfg.retrieval.search_limit);
            let retriever = Retriever::from_config(&cfg)?;
            search::run_search(&retriever, &root, &query, limit, explain)?;
        }
        Commands::Context {
            query,
            root,
            budget,
            json,
        } => {
            let root = root.unwrap_or_else(|| cfg.corpus.root.clone());
            let budget = budget.unwrap_or(cfg.retrieval.budget);
            let retriever = Retriever::from_config(&cfg)?;
            context::run_context(&retriever, &root, &query, budget, json)?;
        }
        Commands::Stats { root } => {
            let root = root.unwrap_or_else(|| cfg.corpus.root.clone());
            let retriever = Retriever::from_config(&cfg)?;
            let snapshot = retriever.cache().get_snapshot(&root)?;
            stats::print_stats(&snapshot);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
