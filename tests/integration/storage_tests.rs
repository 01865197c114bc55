use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

use repoindex::indexing::{IndexOptions, Indexer};
use repoindex::storage::{DocumentStore, FileRecord, JsonStore, TaskStatus};

use crate::helpers::test_harness::TestHarness;

fn record(repo: &str, path: &str, content: &str) -> FileRecord {
    FileRecord::new(repo, path, None, content.to_string(), format!("hash-{}", content.len()))
}

#[tokio::test]
async fn test_repo_and_path_are_the_unique_key() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonStore::open(&temp_dir.path().join("index.json")).await?;

    store.upsert_file(record("one", "a.py", "x = 1")).await?;
    store.upsert_file(record("one", "a.py", "x = 22")).await?;
    store.upsert_file(record("two", "a.py", "y = 1")).await?;

    let one = store.list_files("one").await?;
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].content, "x = 22");
    assert_eq!(store.list_repos().await?, vec!["one", "two"]);
    Ok(())
}

#[tokio::test]
async fn test_index_survives_reopen() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("app.py", "def handler(event):\n    return event\n")?;
    let index_path = harness.path().join(".repoindex/index.json");

    let summary = {
        let store = Arc::new(JsonStore::open(&index_path).await?);
        let indexer = Indexer::new(harness.path().to_path_buf(), harness.config.clone(), store)
            .with_backend(harness.backend.clone());
        indexer.run(&IndexOptions::new("svc")).await?
    };
    assert!(index_path.exists());

    let reopened = JsonStore::open(&index_path).await?;
    let files = reopened.list_files("svc").await?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].embeddings.len(), 1);
    assert_eq!(files[0].embeddings[0].name, "handler");
    assert_eq!(files[0].embeddings[0].vector.len(), 32);

    let task = reopened.get_task(summary.task_id).await?.expect("task stored");
    assert_eq!(task.status, TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_index_is_an_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("index.json");
    std::fs::write(&path, "{ not json")?;
    assert!(JsonStore::open(&path).await.is_err());
    Ok(())
}
