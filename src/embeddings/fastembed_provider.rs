use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::config::FastEmbedConfig;
use super::provider::{fit_dimension, EmbeddingBackend};
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::metrics::{EMBEDDING_LATENCY, EMBEDDING_REQUESTS};

/// Loaded model and the name it was loaded under. Initialised once per
/// process and shared read-only afterwards.
static MODEL: OnceCell<(String, Arc<TextEmbedding>)> = OnceCell::const_new();

/// Local embedding backend running a fastembed ONNX model.
///
/// The model is not loaded until the first `encode` or health check.
pub struct FastEmbedBackend {
    config: FastEmbedConfig,
    dimension: usize,
}

impl FastEmbedBackend {
    pub fn new(config: &FastEmbedConfig, dimension: usize) -> Result<Self> {
        // reject unknown or too-narrow models up front, before any download starts
        let model = Self::parse_model_name(&config.model)?;
        let native = native_dimension(&model);
        if native < dimension {
            anyhow::bail!(
                "fastembed model '{}' produces {}-dimensional vectors; {} are required",
                config.model,
                native,
                dimension
            );
        }
        Ok(Self {
            config: config.clone(),
            dimension,
        })
    }

    /// Parse model name string to fastembed EmbeddingModel enum
    fn parse_model_name(name: &str) -> Result<EmbeddingModel> {
        match name {
            "nomic-embed-text-v1.5" | "nomic-embed-text" | "nomic-ai/nomic-embed-text-v1.5" => {
                Ok(EmbeddingModel::NomicEmbedTextV15)
            }
            "bge-base-en-v1.5" | "bge-base" | "BAAI/bge-base-en-v1.5" => {
                Ok(EmbeddingModel::BGEBaseENV15)
            }
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            other => anyhow::bail!(
                "Unknown fastembed model '{}'. Supported: nomic-embed-text-v1.5, bge-base-en-v1.5, all-MiniLM-L6-v2",
                other
            ),
        }
    }

    async fn model(&self) -> EmbeddingResult<Arc<TextEmbedding>> {
        let (loaded_name, model) = MODEL
            .get_or_try_init(|| {
                let config = self.config.clone();
                let name = config.model.clone();
                async move {
                    tokio::task::spawn_blocking(move || Self::load(&config))
                        .await
                        .context("Model loading task failed")?
                        .map(|model| (name, Arc::new(model)))
                }
            })
            .await
            .map_err(|e: anyhow::Error| EmbeddingError::Unavailable(format!("{:#}", e)))?;

        if *loaded_name != self.config.model {
            warn!(
                requested = %self.config.model,
                loaded = %loaded_name,
                "embedding model already loaded in this process; reusing it"
            );
        }
        Ok(model.clone())
    }

    fn load(config: &FastEmbedConfig) -> Result<TextEmbedding> {
        let model_type = Self::parse_model_name(&config.model)?;
        info!("Loading embedding model: {}", config.model);

        let mut options = InitOptions::new(model_type).with_show_download_progress(true);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        let model = TextEmbedding::try_new(options)
            .with_context(|| format!("Failed to initialize embedding model: {}", config.model))?;
        info!("Embedding model loaded successfully");
        Ok(model)
    }
}

/// Output width of each supported model before truncation.
fn native_dimension(model: &EmbeddingModel) -> usize {
    match model {
        EmbeddingModel::AllMiniLML6V2 => 384,
        _ => 768,
    }
}

#[async_trait]
impl EmbeddingBackend for FastEmbedBackend {
    async fn encode(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let model = self.model().await?;

        EMBEDDING_REQUESTS.inc();
        let start = Instant::now();

        // inference is CPU-bound; keep it off the async workers
        let text = text.to_string();
        let embeddings = tokio::task::spawn_blocking(move || model.embed(vec![text], None))
            .await
            .map_err(|e| EmbeddingError::Backend {
                backend: "fastembed".to_string(),
                reason: format!("embedding task failed: {}", e),
            })?
            .map_err(|e| EmbeddingError::Backend {
                backend: "fastembed".to_string(),
                reason: e.to_string(),
            })?;

        EMBEDDING_LATENCY.observe(start.elapsed().as_secs_f64());

        let vector = embeddings.into_iter().next().ok_or_else(|| EmbeddingError::Backend {
            backend: "fastembed".to_string(),
            reason: "no embedding generated".to_string(),
        })?;
        fit_dimension(vector, self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &'static str {
        "fastembed"
    }
}
