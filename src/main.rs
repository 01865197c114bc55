use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use repoindex::cli::{Cli, Commands};
use repoindex::config::Config;
use repoindex::logging::{init_early_logging, init_logging};
use repoindex::metrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that take a path read their configuration from it
    let project_root = match &cli.command {
        Commands::Init { path, .. }
        | Commands::Index { path, .. }
        | Commands::Deps { path, .. }
        | Commands::Search { path, .. }
        | Commands::Stats { path, .. } => path.clone(),
        Commands::Parse { .. } => None,
    }
    .or_else(|| std::env::current_dir().ok())
    .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::load(&project_root).unwrap_or_default();

    // The guard must live until exit so buffered logs are flushed
    let _logging_guard = match init_logging(&config.logging, &project_root) {
        Ok(guard) => Some(guard),
        Err(e) => {
            init_early_logging();
            tracing::warn!("File logging unavailable: {:#}", e);
            None
        }
    };

    tracing::debug!("Loaded configuration from: {}", project_root.display());

    if let Err(e) = metrics::register_metrics() {
        tracing::warn!("Failed to register metrics: {}", e);
    }

    match cli.command {
        Commands::Init { path, force } => {
            repoindex::commands::init::run(path, force).await?;
        }
        Commands::Index {
            path,
            repo_id,
            force,
            skip_embeddings,
        } => {
            repoindex::commands::index::run(path, repo_id, force, skip_embeddings).await?;
        }
        Commands::Parse { file, language } => {
            repoindex::commands::parse::run(file, language).await?;
        }
        Commands::Deps { path, json } => {
            repoindex::commands::deps::run(path, json).await?;
        }
        Commands::Search {
            query,
            limit,
            path,
            repo_id,
        } => {
            repoindex::commands::search::run(&query, limit, path, repo_id).await?;
        }
        Commands::Stats { prometheus, path } => {
            repoindex::commands::stats::run(prometheus, path).await?;
        }
    }

    Ok(())
}
