//! Index command: walk, parse, resolve and embed a repository into
//! `.repoindex/index.json`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{default_repo_id, resolve_root};
use crate::indexing::{IndexOptions, Indexer};
use crate::storage::JsonStore;
use crate::Config;

/// Run the index command.
///
/// The configuration is read from `<root>/.repoindex/config.toml`; defaults
/// apply when it does not exist.
pub async fn run(
    path: Option<PathBuf>,
    repo_id: Option<String>,
    force: bool,
    skip_embeddings: bool,
) -> Result<()> {
    let root = resolve_root(path)?;
    let config = Config::load(&root)?;
    let repo_id = repo_id.unwrap_or_else(|| default_repo_id(&root));

    let index_path = Config::index_path(&root);
    let store = JsonStore::open(&index_path)
        .await
        .with_context(|| format!("Failed to open index at {}", index_path.display()))?;

    info!(repo = %repo_id, force, skip_embeddings, "Indexing {}", root.display());
    let indexer = Indexer::new(root.clone(), config, Arc::new(store));
    let summary = indexer
        .run(&IndexOptions {
            repo_id,
            force,
            skip_embeddings,
            show_progress: true,
        })
        .await?;

    println!("Repository: {} ({})", summary.repo_id, root.display());
    println!(
        "Indexed {} files in {:.2}s ({} parsed, {} unchanged, {} removed)",
        summary.files_total,
        summary.duration_secs,
        summary.files_parsed,
        summary.files_reused,
        summary.files_removed
    );
    println!(
        "Dependencies: {} internal, {} external",
        summary.dependencies.total_internal_dependencies,
        summary.dependencies.total_external_dependencies
    );
    match &summary.embedding {
        Some(report) => println!(
            "Embeddings: {} units across {} files ({} failed, {} summaries)",
            report.units_embedded, report.files_embedded, report.units_failed, report.summaries_embedded
        ),
        None => println!("Embeddings: skipped"),
    }
    println!("Task: {}", summary.task_id);
    println!();
    summary.errors.print_summary();

    Ok(())
}
