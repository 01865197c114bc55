//! Document store boundary.
//!
//! The indexer reads and writes [`FileRecord`]s keyed by `(repo_id, path)` and
//! [`TaskRecord`]s keyed by task id. Every write replaces the stage output it
//! covers wholesale.

mod json;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::language::Language;
use crate::parser::ParseResult;
use crate::resolver::FileDependencies;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Granularity of an embedded unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    Class,
    Function,
    ClassChunk,
}

impl std::fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingKind::Class => write!(f, "class"),
            EmbeddingKind::Function => write!(f, "function"),
            EmbeddingKind::ClassChunk => write!(f, "class_chunk"),
        }
    }
}

/// One embedded unit of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub kind: EmbeddingKind,
    pub name: String,
    pub source_text: String,
    pub vector: Vec<f32>,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
}

/// Everything stored for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub repo_id: String,
    /// Repository-relative, `/`-separated
    pub path: String,
    pub language: Option<Language>,
    pub content: String,
    /// Hex SHA-256 of `content`
    pub content_hash: String,
    pub size: u64,
    #[serde(default)]
    pub parse: Option<ParseResult>,
    #[serde(default)]
    pub dependencies: FileDependencies,
    /// Whole-file description from the summarizer, if one ran
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub embeddings: Vec<EmbeddingRecord>,
    #[serde(default)]
    pub summary_vector: Option<Vec<f32>>,
    /// `content_hash` at the time the embeddings were last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_hash: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        repo_id: impl Into<String>,
        path: impl Into<String>,
        language: Option<Language>,
        content: String,
        content_hash: String,
    ) -> Self {
        let size = content.len() as u64;
        Self {
            repo_id: repo_id.into(),
            path: path.into(),
            language,
            content,
            content_hash,
            size,
            parse: None,
            dependencies: FileDependencies::default(),
            summary: None,
            embeddings: Vec::new(),
            summary_vector: None,
            embedded_hash: None,
            indexed_at: Utc::now(),
        }
    }

    /// Names of classes and functions, for keyword scoring.
    pub fn entity_names(&self) -> Vec<String> {
        match &self.parse {
            Some(parse) => parse
                .classes
                .iter()
                .map(|c| c.name.clone())
                .chain(parse.functions.iter().map(|f| f.name.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn has_embeddings(&self) -> bool {
        !self.embeddings.is_empty() || self.summary_vector.is_some()
    }

    /// Whether the stored embeddings describe the current content.
    pub fn embeddings_current(&self) -> bool {
        self.has_embeddings() && self.embedded_hash.as_deref() == Some(self.content_hash.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

/// Progress of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub repo_id: String,
    pub stage: String,
    pub processed: usize,
    pub total: usize,
    pub status: TaskStatus,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn start(repo_id: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            repo_id: repo_id.into(),
            stage: "walk".to_string(),
            processed: 0,
            total: 0,
            status: TaskStatus::Running,
            message: None,
            updated_at: Utc::now(),
        }
    }

    /// Move to `stage` with fresh counters.
    pub fn advance(&mut self, stage: &str, processed: usize, total: usize) {
        self.stage = stage.to_string();
        self.processed = processed;
        self.total = total;
        self.updated_at = Utc::now();
    }

    pub fn finish(&mut self, status: TaskStatus, message: impl Into<String>) {
        self.status = status;
        self.message = Some(message.into());
        self.updated_at = Utc::now();
    }
}

/// Storage engine boundary used by the indexer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the whole record under `(repo_id, path)`.
    async fn upsert_file(&self, record: FileRecord) -> StorageResult<()>;

    async fn get_file(&self, repo_id: &str, path: &str) -> StorageResult<Option<FileRecord>>;

    /// All records of a repository, ordered by path.
    async fn list_files(&self, repo_id: &str) -> StorageResult<Vec<FileRecord>>;

    /// Returns whether a record was removed.
    async fn delete_file(&self, repo_id: &str, path: &str) -> StorageResult<bool>;

    async fn list_repos(&self) -> StorageResult<Vec<String>>;

    async fn update_parse(&self, repo_id: &str, path: &str, parse: ParseResult)
        -> StorageResult<()>;

    async fn update_dependencies(
        &self,
        repo_id: &str,
        path: &str,
        dependencies: FileDependencies,
    ) -> StorageResult<()>;

    /// Replace the file's embedding records and summary vector together and
    /// mark them as computed from the stored content.
    async fn update_embeddings(
        &self,
        repo_id: &str,
        path: &str,
        records: Vec<EmbeddingRecord>,
        summary_vector: Option<Vec<f32>>,
    ) -> StorageResult<()>;

    async fn upsert_task(&self, task: TaskRecord) -> StorageResult<()>;

    async fn get_task(&self, task_id: Uuid) -> StorageResult<Option<TaskRecord>>;

    /// Persist buffered writes. No-op for stores without a backing file.
    async fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}
