use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repoindex")]
#[command(author, version, about = "Index a repository: structure, import graph, embeddings and hybrid search")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default .repoindex/config.toml
    Init {
        /// Repository root (defaults to the current directory)
        path: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Parse, resolve and embed a repository
    Index {
        /// Repository root (defaults to the current directory)
        path: Option<PathBuf>,

        /// Identifier stored with every record (defaults to the directory name)
        #[arg(long)]
        repo_id: Option<String>,

        /// Re-parse and re-embed unchanged files
        #[arg(short, long)]
        force: bool,

        /// Stop after dependency resolution
        #[arg(long)]
        skip_embeddings: bool,
    },

    /// Print the structural parse of one file as JSON
    Parse {
        file: PathBuf,

        /// Language tag; detected from the extension when omitted
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Resolve imports and print dependency statistics
    Deps {
        /// Repository root (defaults to the current directory)
        path: Option<PathBuf>,

        /// Print the full graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search an indexed repository
    Search {
        /// Search query
        query: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Repository root (defaults to the current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        #[arg(long)]
        repo_id: Option<String>,
    },

    /// Show index statistics and metrics
    Stats {
        /// Output in Prometheus format
        #[arg(long)]
        prometheus: bool,

        /// Repository root (defaults to the current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}
