use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DocumentStore, EmbeddingRecord, FileRecord, MemoryStore, TaskRecord};
use crate::error::{StorageError, StorageResult};
use crate::parser::ParseResult;
use crate::resolver::FileDependencies;

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    files: Vec<FileRecord>,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// [`MemoryStore`] persisted to a single JSON file on [`DocumentStore::flush`].
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    /// Open the index at `path`; a missing file is an empty index.
    pub async fn open(path: &Path) -> StorageResult<Self> {
        let inner = match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let index: IndexFile = serde_json::from_str(&text)?;
                info!(
                    "Loaded {} file records from {}",
                    index.files.len(),
                    path.display()
                );
                MemoryStore::from_parts(index.files, index.tasks)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No index at {}, starting empty", path.display());
                MemoryStore::new()
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl DocumentStore for JsonStore {
    async fn upsert_file(&self, record: FileRecord) -> StorageResult<()> {
        self.inner.upsert_file(record).await
    }

    async fn get_file(&self, repo_id: &str, path: &str) -> StorageResult<Option<FileRecord>> {
        self.inner.get_file(repo_id, path).await
    }

    async fn list_files(&self, repo_id: &str) -> StorageResult<Vec<FileRecord>> {
        self.inner.list_files(repo_id).await
    }

    async fn delete_file(&self, repo_id: &str, path: &str) -> StorageResult<bool> {
        self.inner.delete_file(repo_id, path).await
    }

    async fn list_repos(&self) -> StorageResult<Vec<String>> {
        self.inner.list_repos().await
    }

    async fn update_parse(
        &self,
        repo_id: &str,
        path: &str,
        parse: ParseResult,
    ) -> StorageResult<()> {
        self.inner.update_parse(repo_id, path, parse).await
    }

    async fn update_dependencies(
        &self,
        repo_id: &str,
        path: &str,
        dependencies: FileDependencies,
    ) -> StorageResult<()> {
        self.inner
            .update_dependencies(repo_id, path, dependencies)
            .await
    }

    async fn update_embeddings(
        &self,
        repo_id: &str,
        path: &str,
        records: Vec<EmbeddingRecord>,
        summary_vector: Option<Vec<f32>>,
    ) -> StorageResult<()> {
        self.inner
            .update_embeddings(repo_id, path, records, summary_vector)
            .await
    }

    async fn upsert_task(&self, task: TaskRecord) -> StorageResult<()> {
        self.inner.upsert_task(task).await
    }

    async fn get_task(&self, task_id: Uuid) -> StorageResult<Option<TaskRecord>> {
        self.inner.get_task(task_id).await
    }

    /// Write the whole index atomically: a temp file next to the target,
    /// then rename.
    async fn flush(&self) -> StorageResult<()> {
        let (files, tasks) = self.inner.snapshot().await;
        let count = files.len();
        let index = IndexFile {
            version: FORMAT_VERSION,
            files,
            tasks,
        };
        let json = serde_json::to_vec(&index)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!("Wrote {} file records to {}", count, self.path.display());
        Ok(())
    }
}
