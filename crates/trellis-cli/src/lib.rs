//! Command-line front end for Trellis.
//!
//! Results go to stdout as JSON (or a plain table for `query --format text`);
//! logs go to stderr.

mod commands;
mod providers;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use trellis_config::Config;
use trellis_index::QueryMode;

pub use commands::execute;
pub use providers::{build_embedder, build_extractor, build_trellis};

#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(about = "Hybrid knowledge graph + vector retrieval")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides storage.data_dir)
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract triples from text and add them to the store
    Ingest {
        /// File to read (stdin if neither FILE nor --text is given)
        file: Option<PathBuf>,

        /// Inline text to ingest
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
    },

    /// Run a graph-boosted semantic query
    Query {
        /// Query text
        query: String,

        /// vector, graph or hybrid
        #[arg(short, long)]
        mode: Option<QueryMode>,

        /// Weight of the vector score
        #[arg(long)]
        alpha: Option<f32>,

        /// Weight of the graph boost
        #[arg(long)]
        beta: Option<f32>,

        /// Number of anchor nodes
        #[arg(short, long)]
        k_anchors: Option<usize>,

        /// Expansion depth
        #[arg(long)]
        max_hops: Option<usize>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Export the graph as node-link JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show node, edge and vector counts
    Stats,

    /// Remove one node with its edges and vector
    Remove {
        /// Node id, e.g. "person:ada lovelace"
        id: String,
    },

    /// Delete every node, edge and vector
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// List saved snapshot versions, newest first
    Snapshots,

    /// Make a saved snapshot version current again
    Rollback {
        /// Version to restore
        version: u32,
    },

    /// Print the effective configuration
    Config {
        /// Write it to the config file (--config, or the default location)
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Install the stderr log subscriber.
///
/// `-v` flags take precedence over `RUST_LOG`; without either the level is
/// `info`.
pub fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // A second init (e.g. in tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load configuration, applying the `--data-dir` override.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.to_string_lossy().into_owned();
    }
    Ok(config)
}

/// Parse arguments, run the command and print its output.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = execute(cli).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
