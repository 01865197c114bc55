use anyhow::Result;

use repoindex::embeddings::EmbeddingBackend;
use repoindex::search::{HybridScorer, Search, SearchEngine};
use repoindex::storage::DocumentStore;
use std::sync::Arc;

use crate::helpers::test_harness::{TestHarness, REPO_ID};

async fn indexed() -> Result<TestHarness> {
    let harness = TestHarness::new()?;
    harness.create_test_file(
        "src/rdb_parser.py",
        "class RdbParser:\n    def read_header(self, stream):\n        return stream.read(9)\n",
    )?;
    harness.create_test_file(
        "src/http_client.py",
        "def fetch(url):\n    return url\n",
    )?;
    harness.create_test_file("src/util.py", "def clamp(x, lo, hi):\n    return max(lo, min(x, hi))\n")?;
    harness.index().await?;
    Ok(harness)
}

#[tokio::test]
async fn test_filename_and_entity_terms_rank_first() -> Result<()> {
    let harness = indexed().await?;
    let store: Arc<dyn DocumentStore> = harness.store.clone();
    let engine = SearchEngine::new(store, None, HybridScorer::default(), REPO_ID);

    let results = engine.search("rdb parser", 10).await?;
    assert_eq!(results[0].path, "src/rdb_parser.py");
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    assert_eq!(engine.search_type(), "hybrid");
    Ok(())
}

#[tokio::test]
async fn test_vector_match_finds_unit() -> Result<()> {
    let harness = indexed().await?;
    let store: Arc<dyn DocumentStore> = harness.store.clone();
    let backend: Arc<dyn EmbeddingBackend> = harness.backend.clone();
    let engine = SearchEngine::new(store, Some(backend), HybridScorer::default(), REPO_ID);

    // identical text embeds to the identical mock vector
    let results = engine.search("def fetch(url):\n    return url", 3).await?;
    assert_eq!(results[0].path, "src/http_client.py");
    let (name, start, end) = results[0].unit.clone().expect("best unit");
    assert_eq!((name.as_str(), start, end), ("fetch", 1, 2));
    Ok(())
}

#[tokio::test]
async fn test_limit_and_empty_repo() -> Result<()> {
    let harness = indexed().await?;
    let store: Arc<dyn DocumentStore> = harness.store.clone();
    let engine = SearchEngine::new(store.clone(), None, HybridScorer::default(), REPO_ID);
    assert!(engine.search("src", 1).await?.len() <= 1);

    let other = SearchEngine::new(store, None, HybridScorer::default(), "nothing-here");
    assert!(other.search("parser", 10).await?.is_empty());
    Ok(())
}
