//! Repository-wide embedding run.
//!
//! Files go through in fixed-size batches. Within a batch every unit is
//! dispatched at once, with a semaphore capping the calls outstanding at the
//! backend. Batch N+1 starts only after batch N has been written.

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::chunking::{plan_units, EmbeddingUnit};
use super::config::EmbeddingsConfig;
use super::provider::EmbeddingBackend;
use crate::config::ChunkingConfig;
use crate::error::EmbeddingError;
use crate::metrics::EMBEDDING_FAILURES;
use crate::storage::{DocumentStore, EmbeddingRecord, FileRecord};

/// Totals for one embedding run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmbeddingReport {
    pub files_total: usize,
    /// Files whose records were written
    pub files_embedded: usize,
    pub units_embedded: usize,
    pub units_failed: usize,
    pub summaries_embedded: usize,
}

/// Result of embedding one file, before it is written.
struct FileOutcome {
    path: String,
    records: Vec<EmbeddingRecord>,
    summary_vector: Option<Vec<f32>>,
    attempted: usize,
    failed: usize,
}

impl FileOutcome {
    /// Write unless every attempted unit failed; in that case the prior
    /// records stay.
    fn should_write(&self) -> bool {
        self.attempted == 0 || self.failed < self.attempted
    }
}

pub struct EmbeddingPipeline {
    backend: Arc<dyn EmbeddingBackend>,
    chunking: ChunkingConfig,
    batch_files: usize,
    limiter: Arc<Semaphore>,
    progress: Option<ProgressBar>,
}

impl EmbeddingPipeline {
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        config: &EmbeddingsConfig,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            backend,
            chunking,
            batch_files: config.batch_files.max(1),
            limiter: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            progress: None,
        }
    }

    /// Report per-file progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn backend(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.backend
    }

    /// Embed every unit and summary of `files` and replace their stored
    /// embeddings.
    ///
    /// Per-unit failures are logged and skipped. Fails with
    /// [`EmbeddingError::Unavailable`] when the backend fails its health
    /// check or every attempted unit fails.
    pub async fn embed_repository(
        &self,
        store: &dyn DocumentStore,
        repo_id: &str,
        files: &[FileRecord],
    ) -> Result<EmbeddingReport> {
        self.ensure_available().await?;

        let mut report = EmbeddingReport {
            files_total: files.len(),
            ..Default::default()
        };
        let mut attempted = 0;
        if let Some(pb) = &self.progress {
            pb.set_length(files.len() as u64);
            pb.set_message("Embedding");
        }

        for batch in files.chunks(self.batch_files) {
            let outcomes = join_all(batch.iter().map(|file| self.embed_file(file))).await;

            for outcome in outcomes {
                attempted += outcome.attempted;
                report.units_failed += outcome.failed;
                if !outcome.should_write() {
                    warn!(path = %outcome.path, "every unit failed; keeping previous embeddings");
                    continue;
                }
                report.units_embedded += outcome.records.len();
                if outcome.summary_vector.is_some() {
                    report.summaries_embedded += 1;
                }
                store
                    .update_embeddings(repo_id, &outcome.path, outcome.records, outcome.summary_vector)
                    .await
                    .with_context(|| format!("Failed to store embeddings for {}", outcome.path))?;
                report.files_embedded += 1;
            }

            if let Some(pb) = &self.progress {
                pb.inc(batch.len() as u64);
            }
        }

        if attempted > 0 && report.units_failed == attempted {
            return Err(EmbeddingError::Unavailable(format!(
                "all {} embedding calls to '{}' failed",
                attempted,
                self.backend.backend_name()
            ))
            .into());
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message("Embedded");
        }
        info!(
            files = report.files_embedded,
            units = report.units_embedded,
            failed = report.units_failed,
            summaries = report.summaries_embedded,
            "Embedding run complete"
        );
        Ok(report)
    }

    /// Re-embed only the summary vectors of `repo_id`, keeping each file's
    /// code records.
    pub async fn regenerate_summaries(
        &self,
        store: &dyn DocumentStore,
        repo_id: &str,
    ) -> Result<EmbeddingReport> {
        self.ensure_available().await?;

        let files: Vec<FileRecord> = store
            .list_files(repo_id)
            .await
            .context("Failed to list files")?
            .into_iter()
            .filter(|f| f.summary.as_deref().is_some_and(|s| !s.trim().is_empty()))
            .collect();

        let mut report = EmbeddingReport {
            files_total: files.len(),
            ..Default::default()
        };

        for batch in files.chunks(self.batch_files) {
            let vectors = join_all(batch.iter().map(|file| {
                let text = file.summary.as_deref().unwrap_or_default();
                self.encode(&file.path, "summary", text)
            }))
            .await;

            for (file, vector) in batch.iter().zip(vectors) {
                let Some(vector) = vector else {
                    report.units_failed += 1;
                    continue;
                };
                store
                    .update_embeddings(repo_id, &file.path, file.embeddings.clone(), Some(vector))
                    .await
                    .with_context(|| format!("Failed to store summary for {}", file.path))?;
                report.summaries_embedded += 1;
                report.files_embedded += 1;
            }
        }

        if !files.is_empty() && report.summaries_embedded == 0 {
            return Err(EmbeddingError::Unavailable(format!(
                "no summary could be embedded by '{}'",
                self.backend.backend_name()
            ))
            .into());
        }
        Ok(report)
    }

    async fn ensure_available(&self) -> Result<()> {
        let health = self.backend.health_check().await;
        debug!(backend = self.backend.backend_name(), ?health, "backend health");
        if !health.is_usable() {
            return Err(EmbeddingError::Unavailable(format!(
                "'{}' failed its health check: {:?}",
                self.backend.backend_name(),
                health
            ))
            .into());
        }
        Ok(())
    }

    async fn embed_file(&self, file: &FileRecord) -> FileOutcome {
        let units = match &file.parse {
            Some(parse) => plan_units(parse, &file.content, &self.chunking),
            None => Vec::new(),
        };
        let summary = file
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        let unit_calls = units
            .iter()
            .map(|unit| self.encode(&file.path, &unit.name, &unit.text));
        let summary_call = async {
            match summary {
                Some(text) => self.encode(&file.path, "summary", text).await,
                None => None,
            }
        };
        let (vectors, summary_vector) = tokio::join!(join_all(unit_calls), summary_call);

        let attempted = units.len() + usize::from(summary.is_some());
        let mut failed = usize::from(summary.is_some() && summary_vector.is_none());
        let mut records = Vec::with_capacity(units.len());
        for (unit, vector) in units.into_iter().zip(vectors) {
            match vector {
                Some(vector) => records.push(to_record(unit, vector)),
                None => failed += 1,
            }
        }

        FileOutcome {
            path: file.path.clone(),
            records,
            summary_vector,
            attempted,
            failed,
        }
    }

    /// One backend call under the in-flight limit. Failures become `None`.
    async fn encode(&self, path: &str, unit: &str, text: &str) -> Option<Vec<f32>> {
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => return None,
        };
        match self.backend.encode(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                EMBEDDING_FAILURES.inc();
                warn!(path, unit, error = %e, "skipping unit");
                None
            }
        }
    }
}

fn to_record(unit: EmbeddingUnit, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        kind: unit.kind,
        name: unit.name,
        source_text: unit.text,
        vector,
        line_start: unit.line_start,
        line_end: unit.line_end,
        chunk_index: unit.chunk_index,
        total_chunks: unit.total_chunks,
    }
}
