use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, EmbeddingRecord, FileRecord, TaskRecord};
use crate::error::{StorageError, StorageResult};
use crate::parser::ParseResult;
use crate::resolver::FileDependencies;

type FileKey = (String, String);

/// Store held entirely in memory. The `(repo_id, path)` map key is the
/// uniqueness constraint.
#[derive(Default)]
pub struct MemoryStore {
    files: RwLock<HashMap<FileKey, FileRecord>>,
    tasks: RwLock<HashMap<Uuid, TaskRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_parts(files: Vec<FileRecord>, tasks: Vec<TaskRecord>) -> Self {
        let files = files
            .into_iter()
            .map(|f| ((f.repo_id.clone(), f.path.clone()), f))
            .collect();
        let tasks = tasks.into_iter().map(|t| (t.task_id, t)).collect();
        Self {
            files: RwLock::new(files),
            tasks: RwLock::new(tasks),
        }
    }

    /// Snapshot of every record, ordered by repository then path.
    pub(super) async fn snapshot(&self) -> (Vec<FileRecord>, Vec<TaskRecord>) {
        let mut files: Vec<FileRecord> = self.files.read().await.values().cloned().collect();
        files.sort_by(|a, b| (&a.repo_id, &a.path).cmp(&(&b.repo_id, &b.path)));
        let mut tasks: Vec<TaskRecord> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by_key(|t| t.updated_at);
        (files, tasks)
    }

    async fn modify<F>(&self, repo_id: &str, path: &str, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut FileRecord),
    {
        let mut files = self.files.write().await;
        let record = files
            .get_mut(&(repo_id.to_string(), path.to_string()))
            .ok_or_else(|| StorageError::NotFound {
                repo_id: repo_id.to_string(),
                path: path.to_string(),
            })?;
        f(record);
        record.indexed_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert_file(&self, record: FileRecord) -> StorageResult<()> {
        let key = (record.repo_id.clone(), record.path.clone());
        self.files.write().await.insert(key, record);
        Ok(())
    }

    async fn get_file(&self, repo_id: &str, path: &str) -> StorageResult<Option<FileRecord>> {
        let files = self.files.read().await;
        Ok(files
            .get(&(repo_id.to_string(), path.to_string()))
            .cloned())
    }

    async fn list_files(&self, repo_id: &str) -> StorageResult<Vec<FileRecord>> {
        let files = self.files.read().await;
        let mut records: Vec<FileRecord> = files
            .values()
            .filter(|f| f.repo_id == repo_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    async fn delete_file(&self, repo_id: &str, path: &str) -> StorageResult<bool> {
        let mut files = self.files.write().await;
        Ok(files
            .remove(&(repo_id.to_string(), path.to_string()))
            .is_some())
    }

    async fn list_repos(&self) -> StorageResult<Vec<String>> {
        let files = self.files.read().await;
        let repos: BTreeSet<&String> = files.keys().map(|(repo, _)| repo).collect();
        Ok(repos.into_iter().cloned().collect())
    }

    async fn update_parse(
        &self,
        repo_id: &str,
        path: &str,
        parse: ParseResult,
    ) -> StorageResult<()> {
        self.modify(repo_id, path, |r| r.parse = Some(parse)).await
    }

    async fn update_dependencies(
        &self,
        repo_id: &str,
        path: &str,
        dependencies: FileDependencies,
    ) -> StorageResult<()> {
        self.modify(repo_id, path, |r| r.dependencies = dependencies)
            .await
    }

    async fn update_embeddings(
        &self,
        repo_id: &str,
        path: &str,
        records: Vec<EmbeddingRecord>,
        summary_vector: Option<Vec<f32>>,
    ) -> StorageResult<()> {
        self.modify(repo_id, path, |r| {
            r.embeddings = records;
            r.summary_vector = summary_vector;
            r.embedded_hash = Some(r.content_hash.clone());
        })
        .await
    }

    async fn upsert_task(&self, task: TaskRecord) -> StorageResult<()> {
        self.tasks.write().await.insert(task.task_id, task);
        Ok(())
    }

    async fn get_task(&self, task_id: Uuid) -> StorageResult<Option<TaskRecord>> {
        Ok(self.tasks.read().await.get(&task_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::storage::{EmbeddingKind, TaskStatus};

    fn record(repo: &str, path: &str, content: &str) -> FileRecord {
        FileRecord::new(
            repo,
            path,
            Language::detect(std::path::Path::new(path)),
            content.to_string(),
            format!("hash-{}", content.len()),
        )
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let store = MemoryStore::new();
        let mut first = record("r", "a.py", "x = 1");
        first.summary = Some("old".into());
        store.upsert_file(first).await.unwrap();
        store.upsert_file(record("r", "a.py", "x = 2")).await.unwrap();

        let files = store.list_files("r").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "x = 2");
        assert!(files[0].summary.is_none());
    }

    #[tokio::test]
    async fn test_same_path_in_two_repos() {
        let store = MemoryStore::new();
        store.upsert_file(record("one", "a.py", "")).await.unwrap();
        store.upsert_file(record("two", "a.py", "")).await.unwrap();
        assert_eq!(store.list_repos().await.unwrap(), vec!["one", "two"]);
        assert!(store.delete_file("one", "a.py").await.unwrap());
        assert!(!store.delete_file("one", "a.py").await.unwrap());
        assert!(store.get_file("two", "a.py").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_parse("r", "missing.py", ParseResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_embeddings_replaces() {
        let store = MemoryStore::new();
        store.upsert_file(record("r", "a.py", "def f(): pass")).await.unwrap();

        let unit = EmbeddingRecord {
            kind: EmbeddingKind::Function,
            name: "f".into(),
            source_text: "def f(): pass".into(),
            vector: vec![0.1; 4],
            line_start: 1,
            line_end: 1,
            chunk_index: None,
            total_chunks: None,
        };
        store
            .update_embeddings("r", "a.py", vec![unit.clone(), unit], Some(vec![0.2; 4]))
            .await
            .unwrap();
        assert!(store.get_file("r", "a.py").await.unwrap().unwrap().embeddings_current());
        store
            .update_embeddings("r", "a.py", vec![], None)
            .await
            .unwrap();

        let file = store.get_file("r", "a.py").await.unwrap().unwrap();
        assert!(file.embeddings.is_empty());
        assert!(file.summary_vector.is_none());
    }

    #[tokio::test]
    async fn test_task_round_trip() {
        let store = MemoryStore::new();
        let mut task = TaskRecord::start("r");
        task.advance("parse", 3, 10);
        store.upsert_task(task.clone()).await.unwrap();
        task.finish(TaskStatus::Completed, "done");
        store.upsert_task(task.clone()).await.unwrap();

        let stored = store.get_task(task.task_id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.stage, "parse");
        assert!(store.get_task(Uuid::new_v4()).await.unwrap().is_none());
    }
}
