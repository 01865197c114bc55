use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use repoindex::embeddings::{EmbeddingBackend, MockBackend, ProviderType};
use repoindex::indexing::{IndexOptions, IndexSummary, Indexer};
use repoindex::storage::{DocumentStore, MemoryStore};
use repoindex::Config;

pub const REPO_ID: &str = "fixture";

/// A synthetic repository on disk plus an in-memory index.
pub struct TestHarness {
    pub temp_dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<MockBackend>,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        let mut config = Config::default();
        config.embeddings.provider = ProviderType::Mock;
        config.embeddings.dimension = 32;
        config.indexer.parallel_threads = Some(2);

        Ok(Self {
            temp_dir: TempDir::new()?,
            store: Arc::new(MemoryStore::new()),
            backend: Arc::new(MockBackend::new(32)),
            config,
        })
    }

    pub fn create_test_file(&self, path: &str, content: &str) -> Result<PathBuf> {
        let file_path = self.temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, content)?;
        Ok(file_path)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn indexer(&self) -> Indexer {
        let store: Arc<dyn DocumentStore> = self.store.clone();
        let backend: Arc<dyn EmbeddingBackend> = self.backend.clone();
        Indexer::new(self.path().to_path_buf(), self.config.clone(), store).with_backend(backend)
    }

    pub async fn index(&self) -> Result<IndexSummary> {
        self.indexer().run(&IndexOptions::new(REPO_ID)).await
    }
}
