//! Stats command for displaying index statistics and metrics

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use super::resolve_root;
use crate::metrics::{gather_metrics, MetricSnapshot, EMBEDDED_UNITS, INDEXED_FILES};
use crate::storage::{DocumentStore, JsonStore};
use crate::Config;

/// Counts read from the stored index.
struct IndexCounts {
    repos: Vec<(String, usize, usize)>,
    files: usize,
    units: usize,
}

async fn load_counts(root: &std::path::Path) -> Result<IndexCounts> {
    let index_path = Config::index_path(root);
    if !index_path.exists() {
        bail!("No index found at {}. Run 'repoindex index' first.", index_path.display());
    }
    let store = JsonStore::open(&index_path)
        .await
        .with_context(|| format!("Failed to open index at {}", index_path.display()))?;

    let mut counts = IndexCounts {
        repos: Vec::new(),
        files: 0,
        units: 0,
    };
    for repo in store.list_repos().await? {
        let files = store.list_files(&repo).await?;
        let units: usize = files.iter().map(|f| f.embeddings.len()).sum();
        counts.files += files.len();
        counts.units += units;
        counts.repos.push((repo, files.len(), units));
    }

    INDEXED_FILES.set(counts.files as f64);
    EMBEDDED_UNITS.set(counts.units as f64);
    Ok(counts)
}

/// Run the stats command
///
/// # Arguments
/// * `prometheus` - If true, output in Prometheus text format
pub async fn run(prometheus: bool, path: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(path)?;
    let counts = load_counts(&root).await?;

    if prometheus {
        print!("{}", gather_metrics());
        return Ok(());
    }

    let snapshot = MetricSnapshot::capture();

    println!("repoindex Statistics");
    println!("====================\n");

    println!("Index Contents:");
    println!("  Total files:  {}", counts.files);
    println!("  Total units:  {}", counts.units);
    for (repo, files, units) in &counts.repos {
        println!("  - {}: {} files, {} units", repo, files, units);
    }
    println!();

    println!("Search Metrics:");
    println!("  Total requests:   {:.0}", snapshot.search_requests_total);
    if snapshot.search_requests_total > 0.0 {
        println!("  Average latency:  {:.3}s", snapshot.search_latency_avg);
    }
    println!();

    println!("Embedding Metrics:");
    println!("  Total requests:   {:.0}", snapshot.embedding_requests_total);
    println!("  Failures:         {:.0}", snapshot.embedding_failures_total);
    println!();

    println!("Storage:");
    println!("  Index path: {}", Config::index_path(&root).display());

    Ok(())
}
