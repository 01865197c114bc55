use anyhow::Result;
use std::sync::Arc;

use repoindex::embeddings::{EmbeddingBackend, MockBackend};
use repoindex::indexing::{IndexOptions, Indexer, ProcessingStage};
use repoindex::storage::{DocumentStore, EmbeddingKind, TaskStatus};

use crate::helpers::test_harness::{TestHarness, REPO_ID};

fn big_class(lines: usize) -> String {
    let mut source = String::from("class Huge:\n");
    for i in 1..lines {
        source.push_str(&format!("    x{} = {}\n", i, i));
    }
    source
}

#[tokio::test]
async fn test_full_workflow() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("app/main.py", "from app.db import connect\n\ndef main():\n    connect()\n")?;
    harness.create_test_file("app/db.py", "class Pool:\n    pass\n\ndef connect():\n    return Pool()\n")?;
    harness.create_test_file("app/__init__.py", "")?;
    harness.create_test_file("app/broken.py", "def broken(:\n")?;
    harness.create_test_file("node_modules/dep/index.js", "module.exports = 1;\n")?;
    harness.create_test_file("README.md", "# fixture\n")?;

    let summary = harness.index().await?;
    assert_eq!(summary.files_total, 4);
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.errors.count(ProcessingStage::Parsing), 1);

    let embedding = summary.embedding.expect("embedding report");
    assert_eq!(embedding.units_embedded, 3);
    assert_eq!(embedding.units_failed, 0);

    let db = harness.store.get_file(REPO_ID, "app/db.py").await?.expect("db.py stored");
    let kinds: Vec<_> = db.embeddings.iter().map(|e| (e.kind, e.name.as_str())).collect();
    assert_eq!(kinds, vec![(EmbeddingKind::Class, "Pool"), (EmbeddingKind::Function, "connect")]);
    assert_eq!(db.dependencies.imported_by, vec!["app/main.py"]);
    assert_eq!(db.content_hash.len(), 64);

    let broken = harness.store.get_file(REPO_ID, "app/broken.py").await?.expect("broken.py stored");
    assert!(broken.parse.as_ref().and_then(|p| p.parse_error.as_ref()).is_some());
    assert!(broken.embeddings.is_empty());

    let task = harness.store.get_task(summary.task_id).await?.expect("task");
    assert_eq!(task.status, TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_large_class_is_windowed() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("huge.py", &big_class(1600))?;
    harness.index().await?;

    let file = harness.store.get_file(REPO_ID, "huge.py").await?.expect("stored");
    let spans: Vec<_> = file
        .embeddings
        .iter()
        .map(|e| (e.kind, e.line_start, e.line_end, e.chunk_index, e.total_chunks))
        .collect();
    assert_eq!(
        spans,
        vec![
            (EmbeddingKind::ClassChunk, 1, 700, Some(1), Some(3)),
            (EmbeddingKind::ClassChunk, 601, 1300, Some(2), Some(3)),
            (EmbeddingKind::ClassChunk, 1201, 1600, Some(3), Some(3)),
        ]
    );
    assert_eq!(file.embeddings[0].name, "Huge_chunk_1");
    Ok(())
}

#[tokio::test]
async fn test_failed_units_are_skipped() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("jobs.py", "def good():\n    return 1\n\ndef poison():\n    return 2\n")?;

    let backend: Arc<dyn EmbeddingBackend> = Arc::new(MockBackend::new(32).failing_on("poison"));
    let store: Arc<dyn DocumentStore> = harness.store.clone();
    let indexer = Indexer::new(harness.path().to_path_buf(), harness.config.clone(), store)
        .with_backend(backend);
    let summary = indexer.run(&IndexOptions::new(REPO_ID)).await?;

    let report = summary.embedding.expect("embedding report");
    assert_eq!(report.units_embedded, 1);
    assert_eq!(report.units_failed, 1);

    let jobs = harness.store.get_file(REPO_ID, "jobs.py").await?.expect("stored");
    let names: Vec<_> = jobs.embeddings.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["good"]);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_backend_fails_the_run() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("a.py", "def a():\n    return 1\n")?;

    let backend: Arc<dyn EmbeddingBackend> = Arc::new(MockBackend::new(32).unreachable());
    let store: Arc<dyn DocumentStore> = harness.store.clone();
    let indexer = Indexer::new(harness.path().to_path_buf(), harness.config.clone(), store)
        .with_backend(backend);

    let err = indexer.run(&IndexOptions::new(REPO_ID)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("health check"));

    // structural output from earlier stages is kept
    let a = harness.store.get_file(REPO_ID, "a.py").await?.expect("stored");
    assert_eq!(a.entity_names(), vec!["a"]);
    Ok(())
}

#[tokio::test]
async fn test_reindex_only_touches_changed_files() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("a.py", "def a():\n    return 1\n")?;
    harness.create_test_file("b.py", "def b():\n    return 1\n")?;
    harness.index().await?;
    let calls = harness.backend.calls();

    let unchanged = harness.index().await?;
    assert_eq!(unchanged.files_reused, 2);
    assert_eq!(harness.backend.calls(), calls);

    harness.create_test_file("b.py", "def b():\n    return 2\n")?;
    let changed = harness.index().await?;
    assert_eq!(changed.files_reused, 1);
    assert_eq!(changed.files_parsed, 1);
    assert_eq!(harness.backend.calls(), calls + 1);
    Ok(())
}

#[tokio::test]
#[ignore] // downloads the local embedding model
async fn test_fastembed_end_to_end() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("a.py", "def add(x, y):\n    return x + y\n")?;

    let mut config = harness.config.clone();
    config.embeddings = Default::default();
    let store: Arc<dyn DocumentStore> = harness.store.clone();
    let summary = Indexer::new(harness.path().to_path_buf(), config, store)
        .run(&IndexOptions::new(REPO_ID))
        .await?;
    assert_eq!(summary.embedding.map(|r| r.units_embedded), Some(1));

    let a = harness.store.get_file(REPO_ID, "a.py").await?.expect("stored");
    assert_eq!(a.embeddings[0].vector.len(), 768);
    Ok(())
}
