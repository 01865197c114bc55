//! Deps command: resolve the import graph without embedding anything.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{default_repo_id, resolve_root};
use crate::indexing::Indexer;
use crate::storage::MemoryStore;
use crate::Config;

pub async fn run(path: Option<PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root(path)?;
    let config = Config::load(&root)?;
    let repo_id = default_repo_id(&root);

    let indexer = Indexer::new(root, config, Arc::new(MemoryStore::new()));
    let graph = indexer.analyze(&repo_id).await?;
    let stats = graph.stats();

    if json {
        let output = serde_json::json!({
            "stats": stats,
            "graph": graph.graph,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Dependency Statistics");
    println!("=====================\n");
    println!("  Files:                {}", stats.total_files);
    println!("  Internal imports:     {}", stats.total_internal_dependencies);
    println!("  External imports:     {}", stats.total_external_dependencies);
    println!("  Average per file:     {:.2}", stats.average_dependencies_per_file);

    if !stats.most_imported.is_empty() {
        println!("\nMost imported:");
        for file in &stats.most_imported {
            println!("  {:>4}  {}", file.count, file.path);
        }
    }
    if !stats.most_dependent.is_empty() {
        println!("\nMost dependent:");
        for file in &stats.most_dependent {
            println!("  {:>4}  {}", file.count, file.path);
        }
    }

    Ok(())
}
