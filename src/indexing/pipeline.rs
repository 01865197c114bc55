//! Repository ingestion: walk, parse, resolve, embed, persist.
//!
//! Stages run in that order and each fully replaces the previous output for
//! the files it touches. Per-file failures are collected; only storage or a
//! wholly unavailable embedding backend stop the run.

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::errors::{ErrorCollector, ErrorReport, ProcessingStage};
use super::walker::{SourceFile, Walker};
use crate::config::Config;
use crate::embeddings::{create_backend, EmbeddingBackend, EmbeddingPipeline, EmbeddingReport};
use crate::metrics::{EMBEDDED_UNITS, INDEXED_FILES, INDEX_LATENCY};
use crate::parser::{ParseResult, ParserRegistry};
use crate::resolver::{DependencyResolver, DependencyStats, FileDependencies, ResolverFile};
use crate::storage::{DocumentStore, FileRecord, TaskRecord, TaskStatus};

/// Options for one [`Indexer::run`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub repo_id: String,
    /// Re-parse and re-embed even when content is unchanged
    pub force: bool,
    pub skip_embeddings: bool,
    pub show_progress: bool,
}

impl IndexOptions {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            force: false,
            skip_embeddings: false,
            show_progress: false,
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub task_id: Uuid,
    pub repo_id: String,
    pub files_total: usize,
    pub files_parsed: usize,
    /// Unchanged files whose stored parse and embeddings were kept
    pub files_reused: usize,
    pub files_removed: usize,
    pub parse_errors: usize,
    pub dependencies: DependencyStats,
    pub embedding: Option<EmbeddingReport>,
    pub errors: ErrorReport,
    pub duration_secs: f64,
}

/// Parsed and resolved repository, not yet persisted.
pub struct RepositoryGraph {
    pub records: Vec<FileRecord>,
    pub graph: BTreeMap<String, FileDependencies>,
}

impl RepositoryGraph {
    pub fn stats(&self) -> DependencyStats {
        DependencyStats::from_graph(&self.graph)
    }
}

pub struct Indexer {
    root: PathBuf,
    config: Config,
    store: Arc<dyn DocumentStore>,
    registry: Arc<ParserRegistry>,
    backend: Option<Arc<dyn EmbeddingBackend>>,
}

impl Indexer {
    pub fn new(root: PathBuf, config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            root,
            config,
            store,
            registry: Arc::new(ParserRegistry::new()),
            backend: None,
        }
    }

    /// Use `backend` instead of building one from the configuration.
    pub fn with_backend(mut self, backend: Arc<dyn EmbeddingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk, parse and resolve without touching the store.
    pub async fn analyze(&self, repo_id: &str) -> Result<RepositoryGraph> {
        let errors = ErrorCollector::new();
        let pool = self.thread_pool()?;
        let sources = self.walk(&errors).await?;
        let parses = self
            .parse(&pool, &sources, &ProgressBar::hidden(), &errors)
            .await?;

        let records = sources
            .into_iter()
            .zip(parses)
            .map(|(source, parse)| {
                let mut record = new_record(repo_id, source);
                record.parse = parse;
                record
            })
            .collect();
        resolve(&pool, records).await
    }

    /// Run the whole ingestion for `options.repo_id`.
    pub async fn run(&self, options: &IndexOptions) -> Result<IndexSummary> {
        let start = Instant::now();
        let repo_id = options.repo_id.as_str();
        let errors = ErrorCollector::new();
        let pool = self.thread_pool()?;

        let mut task = TaskRecord::start(repo_id);
        self.save_task(&task).await?;
        info!(repo = repo_id, root = %self.root.display(), "Indexing started");

        let multi = MultiProgress::new();
        let parse_pb = progress_bar(&multi, options.show_progress, "Parse");
        let embed_pb = progress_bar(&multi, options.show_progress, "Embed");

        // Stage 1: walk
        let sources = self.walk(&errors).await?;
        let files_total = sources.len();
        task.advance("walk", files_total, files_total);
        self.save_task(&task).await?;

        // Stage 2: parse whatever cannot be reused
        let mut existing: HashMap<String, FileRecord> = self
            .store
            .list_files(repo_id)
            .await
            .context("Failed to load existing records")?
            .into_iter()
            .map(|r| (r.path.clone(), r))
            .collect();

        let mut reused: Vec<FileRecord> = Vec::new();
        let mut fresh: Vec<SourceFile> = Vec::new();
        let mut kept_summaries: HashMap<String, String> = HashMap::new();
        let mut kept_embeddings: HashMap<String, FileRecord> = HashMap::new();
        for source in sources {
            match existing.remove(&source.path) {
                Some(old) if !options.force && is_reusable(&old, &source, options.skip_embeddings) => {
                    reused.push(old);
                }
                Some(mut old) => {
                    // a summary describes content, so it survives only unchanged content
                    if old.content_hash == source.content_hash {
                        if let Some(summary) = old.summary.take() {
                            kept_summaries.insert(source.path.clone(), summary);
                        }
                    }
                    // old vectors stay searchable until the embed stage replaces them
                    if old.has_embeddings() {
                        kept_embeddings.insert(source.path.clone(), old);
                    }
                    fresh.push(source);
                }
                None => fresh.push(source),
            }
        }
        let stale: Vec<String> = existing.into_keys().collect();
        debug!(reused = reused.len(), fresh = fresh.len(), stale = stale.len(), "change detection");

        task.advance("parse", 0, fresh.len());
        self.save_task(&task).await?;
        let parses = self.parse(&pool, &fresh, &parse_pb, &errors).await?;
        let files_parsed = parses.iter().filter(|p| p.is_some()).count();
        let parse_errors = parses
            .iter()
            .flatten()
            .filter(|p| p.parse_error.is_some())
            .count();

        let fresh_paths: Vec<String> = fresh.iter().map(|s| s.path.clone()).collect();
        let mut records = reused;
        let files_reused = records.len();
        records.extend(fresh.into_iter().zip(parses).map(|(source, parse)| {
            let mut record = new_record(repo_id, source);
            record.parse = parse;
            record.summary = kept_summaries.remove(&record.path);
            if let Some(old) = kept_embeddings.remove(&record.path) {
                record.embeddings = old.embeddings;
                record.summary_vector = old.summary_vector;
                record.embedded_hash = old.embedded_hash;
            }
            record
        }));
        records.sort_by(|a, b| a.path.cmp(&b.path));

        // Stage 3: resolve repository-wide
        task.advance("resolve", 0, records.len());
        self.save_task(&task).await?;
        let RepositoryGraph { records, graph } = resolve(&pool, records).await?;
        let dependencies = DependencyStats::from_graph(&graph);

        for path in &stale {
            self.store
                .delete_file(repo_id, path)
                .await
                .with_context(|| format!("Failed to delete {}", path))?;
        }
        for record in &records {
            self.store
                .upsert_file(record.clone())
                .await
                .with_context(|| format!("Failed to store {}", record.path))?;
        }
        task.advance("resolve", records.len(), records.len());
        self.save_task(&task).await?;

        // Stage 4: embed
        let embedding = if options.skip_embeddings {
            None
        } else {
            let to_embed: Vec<FileRecord> = records
                .iter()
                .filter(|r| r.language.is_some() && fresh_paths.binary_search(&r.path).is_ok())
                .cloned()
                .collect();
            task.advance("embed", 0, to_embed.len());
            self.save_task(&task).await?;

            match self.embed(repo_id, &to_embed, embed_pb).await {
                Ok(report) => {
                    task.advance("embed", to_embed.len(), to_embed.len());
                    Some(report)
                }
                Err(e) => {
                    error!(repo = repo_id, error = %e, "Embedding stage failed");
                    for file in &to_embed {
                        errors.record(file.path.clone(), &e, ProcessingStage::Embedding);
                    }
                    task.finish(TaskStatus::Failed, format!("{:#}", e));
                    self.save_task(&task).await?;
                    self.store.flush().await.context("Failed to persist index")?;
                    return Err(e);
                }
            }
        };

        let total_units: usize = self
            .store
            .list_files(repo_id)
            .await
            .context("Failed to reload records")?
            .iter()
            .map(|r| r.embeddings.len())
            .sum();
        INDEXED_FILES.set(records.len() as f64);
        EMBEDDED_UNITS.set(total_units as f64);

        let duration = start.elapsed();
        INDEX_LATENCY.observe(duration.as_secs_f64());

        let report = errors.get_report();
        task.finish(TaskStatus::Completed, report.summary.clone());
        self.save_task(&task).await?;
        self.store.flush().await.context("Failed to persist index")?;

        info!(
            repo = repo_id,
            files = files_total,
            parsed = files_parsed,
            reused = files_reused,
            errors = report.total_errors,
            "Indexing completed in {:.2}s",
            duration.as_secs_f64()
        );

        Ok(IndexSummary {
            task_id: task.task_id,
            repo_id: repo_id.to_string(),
            files_total,
            files_parsed,
            files_reused,
            files_removed: stale.len(),
            parse_errors,
            dependencies,
            embedding,
            errors: report,
            duration_secs: duration.as_secs_f64(),
        })
    }

    fn thread_pool(&self) -> Result<Arc<rayon::ThreadPool>> {
        let threads = self
            .config
            .indexer
            .parallel_threads
            .unwrap_or_else(num_cpus::get)
            .max(1);
        debug!("Using {} threads for parsing and resolution", threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build worker pool")?;
        Ok(Arc::new(pool))
    }

    async fn save_task(&self, task: &TaskRecord) -> Result<()> {
        self.store
            .upsert_task(task.clone())
            .await
            .context("Failed to record task progress")
    }

    async fn walk(&self, errors: &ErrorCollector) -> Result<Vec<SourceFile>> {
        let walker = Walker::new(self.root.clone(), &self.config.indexer);
        let errors = errors.clone();
        let sources = tokio::task::spawn_blocking(move || walker.read_sources(&errors))
            .await
            .context("File walk task failed")?;
        info!("Found {} files", sources.len());
        Ok(sources)
    }

    /// Parse on the worker pool. Files without a language get `None`; a
    /// panicking parser is recorded as a parse failure.
    async fn parse(
        &self,
        pool: &Arc<rayon::ThreadPool>,
        sources: &[SourceFile],
        progress: &ProgressBar,
        errors: &ErrorCollector,
    ) -> Result<Vec<Option<ParseResult>>> {
        let inputs: Vec<(String, Option<&'static str>, String)> = sources
            .iter()
            .map(|s| (s.path.clone(), s.language.map(|l| l.as_str()), s.content.clone()))
            .collect();
        let registry = self.registry.clone();
        let pool = pool.clone();
        let errors = errors.clone();
        progress.set_length(inputs.len() as u64);
        progress.set_message("Parsing");
        let ticker = progress.clone();

        let parses = tokio::task::spawn_blocking(move || {
            pool.install(|| {
                inputs
                    .par_iter()
                    .map(|(path, language, content)| {
                        ticker.inc(1);
                        let language = (*language)?;
                        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                            registry.parse(content, Path::new(path), language)
                        }));
                        let parse = outcome.unwrap_or_else(|_| {
                            ParseResult::failed(format!("parser panicked on {}", path))
                        });
                        if let Some(reason) = &parse.parse_error {
                            errors.record(path.clone(), reason, ProcessingStage::Parsing);
                        }
                        Some(parse)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await
        .context("Parse task failed")?;

        progress.finish_with_message("Parsed");
        Ok(parses)
    }

    async fn embed(
        &self,
        repo_id: &str,
        files: &[FileRecord],
        progress: ProgressBar,
    ) -> Result<EmbeddingReport> {
        let backend = match &self.backend {
            Some(backend) => backend.clone(),
            None => create_backend(&self.config.embeddings)?,
        };
        let pipeline = EmbeddingPipeline::new(backend, &self.config.embeddings, self.config.chunking)
            .with_progress(progress);
        pipeline
            .embed_repository(self.store.as_ref(), repo_id, files)
            .await
    }
}

/// Stored parse output can stand in for a new one when the content is
/// unchanged and, unless embedding is skipped, embeddings already exist.
fn is_reusable(old: &FileRecord, source: &SourceFile, skip_embeddings: bool) -> bool {
    old.content_hash == source.content_hash
        && (old.parse.is_some() || source.language.is_none())
        && (skip_embeddings || old.embeddings_current() || source.language.is_none())
}

fn new_record(repo_id: &str, source: SourceFile) -> FileRecord {
    let mut record = FileRecord::new(
        repo_id,
        source.path,
        source.language,
        source.content,
        source.content_hash,
    );
    record.size = source.size;
    record
}

/// Resolve imports across `records` and attach each file's dependencies.
async fn resolve(pool: &Arc<rayon::ThreadPool>, records: Vec<FileRecord>) -> Result<RepositoryGraph> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let graph = {
            let files: Vec<ResolverFile<'_>> = records
                .iter()
                .map(|r| ResolverFile {
                    path: &r.path,
                    language: r.language,
                    imports: r.parse.as_ref().map_or(&[][..], |p| p.imports.as_slice()),
                    content: &r.content,
                })
                .collect();
            pool.install(|| DependencyResolver::new(&files).resolve_all())
        };

        let mut records = records;
        for record in &mut records {
            record.dependencies = graph.get(&record.path).cloned().unwrap_or_default();
        }
        RepositoryGraph { records, graph }
    })
    .await
    .context("Resolution task failed")
}

fn progress_bar(multi: &MultiProgress, visible: bool, label: &str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = multi.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{{elapsed_precise}}] {}: [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
        label
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
