//! Search command: hybrid ranking over an indexed repository.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use super::{default_repo_id, resolve_root};
use crate::embeddings::create_backend;
use crate::search::{HybridScorer, Search, SearchEngine, SearchResult};
use crate::storage::JsonStore;
use crate::Config;

pub async fn run(
    query: &str,
    limit: Option<usize>,
    path: Option<PathBuf>,
    repo_id: Option<String>,
) -> Result<()> {
    let root = resolve_root(path)?;
    let index_path = Config::index_path(&root);
    if !index_path.exists() {
        bail!("No index found at {}. Run 'repoindex index' first.", index_path.display());
    }

    let config = Config::load(&root)?;
    let limit = limit.unwrap_or(config.search.default_limit);
    let repo_id = repo_id.unwrap_or_else(|| default_repo_id(&root));

    let store = JsonStore::open(&index_path)
        .await
        .with_context(|| format!("Failed to open index at {}", index_path.display()))?;

    // lexical ranking still works when no backend can be built
    let backend = match create_backend(&config.embeddings) {
        Ok(backend) => Some(backend),
        Err(e) => {
            warn!(error = %e, "embedding backend unavailable; ranking lexically");
            None
        }
    };

    let engine = SearchEngine::new(
        Arc::new(store),
        backend,
        HybridScorer::from_config(&config.search),
        repo_id,
    );
    let results = engine.search(query, limit).await?;

    if results.is_empty() {
        println!("No results found for: {}", query);
        println!("\nMake sure the repository is indexed with 'repoindex index'");
        return Ok(());
    }

    println!("Found {} results for: \"{}\"\n", results.len(), query);
    for (i, result) in results.iter().enumerate() {
        println!("{}. {}", i + 1, format_result(result));
        if let Some(summary) = &result.summary {
            println!("   {}", summary);
        }
        println!();
    }

    Ok(())
}

fn format_result(result: &SearchResult) -> String {
    let score_pct = (result.score * 100.0).round() as i32;
    match &result.unit {
        Some((name, start, end)) => format!(
            "{}:{}-{} {} (score: {}%, vector {:.2}, keyword {:.2})",
            result.path, start, end, name, score_pct, result.vector_score, result.keyword_score
        ),
        None => format!(
            "{} (score: {}%, vector {:.2}, keyword {:.2})",
            result.path, score_pct, result.vector_score, result.keyword_score
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_result_with_unit() {
        let result = SearchResult {
            path: "src/lib.rs".into(),
            score: 0.456,
            vector_score: 0.5,
            keyword_score: 0.25,
            unit: Some(("parse".into(), 10, 20)),
            summary: None,
        };
        assert_eq!(
            format_result(&result),
            "src/lib.rs:10-20 parse (score: 46%, vector 0.50, keyword 0.25)"
        );
    }
}
