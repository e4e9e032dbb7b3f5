//! # Food Catalog CLI (`foodcat`)
//!
//! The `foodcat` binary manages the product database, serves the query API
//! and browses it from a terminal.
//!
//! ## Usage
//!
//! ```bash
//! foodcat --config ./config/foodcat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `foodcat init` | Create the SQLite database and run schema migrations |
//! | `foodcat import <file>` | Load cleaned product records (JSON array or JSON lines) |
//! | `foodcat fetch <barcode>...` | Pull products from OpenFoodFacts and upsert them |
//! | `foodcat export` | Dump all products as JSON |
//! | `foodcat stats` | Product counts, grade distribution and top categories |
//! | `foodcat get <barcode>` | Print one product |
//! | `foodcat serve` | Start the HTTP query API |
//! | `foodcat browse` | Interactive terminal browser over the API |
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr so
//! command output on stdout stays clean.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use food_catalog::{browse, config, export, fetch, get, ingest, server, sqlite_store, stats};

/// Food Catalog: import, serve and browse a food product catalog.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/foodcat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "foodcat",
    about = "Food Catalog: a read-only product catalog API and terminal browser",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/foodcat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the product tables. Safe to run
    /// more than once.
    Init,

    /// Import cleaned product records.
    ///
    /// Records are upserted by barcode. Records without a barcode are
    /// skipped; unknown grades are stored as absent.
    Import {
        /// JSON array or JSON-lines file.
        file: PathBuf,
    },

    /// Fetch products by barcode from OpenFoodFacts.
    ///
    /// Each product goes through the same cleaning and upsert as `import`.
    /// Unknown barcodes and products that keep failing after the
    /// configured retries are reported and skipped.
    Fetch {
        /// One or more barcodes.
        #[arg(required = true)]
        barcodes: Vec<String>,
    },

    /// Export every product as a JSON array.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show catalog statistics.
    Stats {
        /// Number of categories to list.
        #[arg(long)]
        top: Option<i64>,
    },

    /// Print a single product by barcode.
    Get {
        barcode: String,
    },

    /// Start the HTTP query API on `[server].bind`.
    Serve,

    /// Browse the catalog through a running API.
    Browse {
        /// API base URL; overrides `[client].api_base`.
        #[arg(long)]
        api: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // The browser only needs the client section, so a missing file is fine.
    if let Commands::Browse { api } = &cli.command {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
        let api_base = api.as_deref().unwrap_or(cfg.client.api_base.as_str());
        browse::run_browse(api_base, cfg.client.page_size).await?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = sqlite_store::SqliteStore::open(&cfg).await?;
            store.pool().close().await;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            ingest::run_import(&cfg, &file).await?;
        }
        Commands::Fetch { barcodes } => {
            fetch::run_fetch(&cfg, &barcodes).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Stats { top } => {
            stats::run_stats(&cfg, top).await?;
        }
        Commands::Get { barcode } => {
            get::run_get(&cfg, &barcode).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Browse { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
