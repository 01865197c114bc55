//! Query-time ranking over indexed files.
//!
//! - `keyword` - simplified BM25 facets and the filename boost
//! - `vector` - cosine similarity against stored embeddings
//! - `hybrid` - weighted combination and stable ranking

mod hybrid;
mod keyword;
mod vector;

pub use hybrid::{normalize_weights, Candidate, HybridScorer, ScoredCandidate};
pub use keyword::{bm25, extract_terms, filename_boost, query_terms, Bm25Params, KeywordBreakdown};
pub use vector::{cosine_similarity, file_vector_score, VectorMatch};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::embeddings::EmbeddingBackend;
use crate::metrics::{SEARCH_LATENCY, SEARCH_REQUESTS};
use crate::storage::DocumentStore;

/// One ranked file.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
    /// Best-matching code unit: name and line span
    pub unit: Option<(String, usize, usize)>,
    pub summary: Option<String>,
}

/// Common interface for search implementations.
#[async_trait]
pub trait Search: Send + Sync {
    /// Results sorted by relevance, highest first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    fn search_type(&self) -> &'static str;
}

/// Hybrid search over one repository in a [`DocumentStore`].
///
/// Without a backend every vector score is zero and ranking is purely
/// lexical.
pub struct SearchEngine {
    store: Arc<dyn DocumentStore>,
    backend: Option<Arc<dyn EmbeddingBackend>>,
    scorer: HybridScorer,
    repo_id: String,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        backend: Option<Arc<dyn EmbeddingBackend>>,
        scorer: HybridScorer,
        repo_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            scorer,
            repo_id: repo_id.into(),
        }
    }

    async fn query_vector(&self, query: &str) -> Option<Vec<f32>> {
        let backend = self.backend.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }
        match backend.encode(query).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "query embedding failed; ranking lexically");
                None
            }
        }
    }
}

#[async_trait]
impl Search for SearchEngine {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        SEARCH_REQUESTS.inc();
        let start = Instant::now();

        info!(search_type = "hybrid", query = query, "Starting search");

        let files = self
            .store
            .list_files(&self.repo_id)
            .await
            .with_context(|| format!("Failed to load files of {}", self.repo_id))?;
        let query_vector = self.query_vector(query).await;
        debug!(files = files.len(), vector = query_vector.is_some(), "scoring candidates");

        let matches: Vec<VectorMatch<'_>> = files
            .iter()
            .map(|f| match &query_vector {
                Some(q) => file_vector_score(q, f),
                None => VectorMatch::default(),
            })
            .collect();
        let candidates: Vec<Candidate> = files
            .iter()
            .zip(&matches)
            .map(|(f, m)| Candidate {
                path: f.path.clone(),
                summary: f.summary.clone().unwrap_or_default(),
                entity_names: f.entity_names(),
                vector_score: m.score,
            })
            .collect();

        let results: Vec<SearchResult> = self
            .scorer
            .rank(query, &candidates)
            .into_iter()
            .filter(|r| r.score > 0.0)
            .take(limit)
            .map(|r| {
                let file = &files[r.index];
                SearchResult {
                    path: r.path,
                    score: r.score,
                    vector_score: r.vector_score,
                    keyword_score: r.keyword_score,
                    unit: matches[r.index]
                        .unit
                        .map(|u| (u.name.clone(), u.line_start, u.line_end)),
                    summary: file.summary.clone(),
                }
            })
            .collect();

        let elapsed = start.elapsed();
        SEARCH_LATENCY.observe(elapsed.as_secs_f64());
        info!(
            search_type = "hybrid",
            results = results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );
        Ok(results)
    }

    fn search_type(&self) -> &'static str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockBackend;
    use crate::storage::{EmbeddingKind, EmbeddingRecord, FileRecord, MemoryStore};

    async fn store_with(backend: &MockBackend) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (path, summary, body) in [
            ("src/config_loader.rs", "loads configuration files", "fn load_config() {}"),
            ("src/http.rs", "http client wrapper", "fn get() {}"),
        ] {
            let mut f = FileRecord::new("repo", path, None, body.into(), "h".into());
            f.summary = Some(summary.into());
            f.embeddings = vec![EmbeddingRecord {
                kind: EmbeddingKind::Function,
                name: body.into(),
                source_text: body.into(),
                vector: backend.text_to_vector(body),
                line_start: 1,
                line_end: 1,
                chunk_index: None,
                total_chunks: None,
            }];
            store.upsert_file(f).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_exact_vector_match_wins() {
        let backend = Arc::new(MockBackend::new(32));
        let store = store_with(&backend).await;
        let backend: Arc<dyn EmbeddingBackend> = backend;
        let engine = SearchEngine::new(store, Some(backend), HybridScorer::default(), "repo");

        let results = engine.search("fn get() {}", 10).await.unwrap();
        assert_eq!(results[0].path, "src/http.rs");
        assert!((results[0].vector_score - 1.0).abs() < 1e-5);
        assert_eq!(results[0].unit.as_ref().map(|u| u.0.as_str()), Some("fn get() {}"));
    }

    #[tokio::test]
    async fn test_lexical_only_without_backend() {
        let backend = MockBackend::new(32);
        let store = store_with(&backend).await;
        let engine = SearchEngine::new(store, None, HybridScorer::default(), "repo");

        let results = engine.search("config loader", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "src/config_loader.rs");
        assert_eq!(results[0].vector_score, 0.0);

        assert!(engine.search("", 10).await.unwrap().is_empty());
    }
}
