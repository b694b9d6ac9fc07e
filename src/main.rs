//! # cast-index CLI (`cdx`)
//!
//! The `cdx` binary is a thin wrapper over the cast-index library. It
//! provides commands for database initialization, reindexing, search,
//! and index statistics.
//!
//! ## Usage
//!
//! ```bash
//! cdx --config ./config/cdx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cdx init` | Create the SQLite database and run schema migrations |
//! | `cdx reindex` | Index new and changed recordings |
//! | `cdx search "<query>"` | Search indexed recordings |
//! | `cdx stats` | Show index statistics |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cast_index::{config, db, indexer, migrate, search, stats};

/// cast-index CLI — incremental full-text indexing and search for
/// terminal session recordings.
#[derive(Parser)]
#[command(
    name = "cdx",
    about = "cast-index — incremental full-text indexing and search for terminal session recordings",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cdx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (artifacts, strategy_applications, fragments, fragments_fts, meta).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Index new and changed recordings.
    ///
    /// Discovers recordings in the configured locations, detects changed
    /// files, and reindexes each stale (artifact, strategy) pair inside
    /// its own transaction. The most recently modified recording is
    /// skipped in case it is still being written.
    Reindex,

    /// Search indexed recordings.
    Search {
        /// The search query string (matched as a phrase).
        query: String,

        /// Filter to recordings carrying this tag (repeatable; any match).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only match recordings dated on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Only match recordings dated on or before this date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of results per page.
        #[arg(long)]
        limit: Option<i64>,

        /// One-based page number.
        #[arg(long)]
        page: Option<i64>,

        /// Deduplication window in minutes (0 disables deduplication).
        #[arg(long)]
        window: Option<i64>,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = db::Store::open(&config).await?;
            let result = migrate::run_migrations(&store).await;
            store.close().await;
            result?;
            println!("ok");
            Ok(())
        }
        Commands::Reindex => indexer::run_reindex(&config).await,
        Commands::Search {
            query,
            tags,
            from,
            to,
            limit,
            page,
            window,
        } => search::run_search(&config, &query, tags, from, to, limit, page, window).await,
        Commands::Stats => stats::run_stats(&config).await,
    }
}
