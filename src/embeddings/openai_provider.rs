use anyhow::Result;
use async_openai::{
    config::OpenAIConfig as AsyncOpenAIConfig, types::CreateEmbeddingRequestArgs, Client,
};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::config::OpenAIConfig;
use super::provider::{fit_dimension, EmbeddingBackend, HealthStatus};
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::metrics::{EMBEDDING_LATENCY, EMBEDDING_REQUESTS};

/// Remote backend for any OpenAI-compatible embeddings endpoint.
pub struct OpenAIBackend {
    client: Client<AsyncOpenAIConfig>,
    config: OpenAIConfig,
    dimension: usize,
}

impl OpenAIBackend {
    pub fn new(config: &OpenAIConfig, dimension: usize) -> Result<Self> {
        let api_key = config.load_api_key()?;

        let mut openai_config = AsyncOpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.effective_base_url());

        if let Some(org) = &config.organization {
            openai_config = openai_config.with_org_id(org);
        }

        info!(
            preset = ?config.provider_preset,
            model = config.effective_model(),
            "Initialized OpenAI-compatible embedding backend"
        );

        Ok(Self {
            client: Client::with_config(openai_config),
            config: config.clone(),
            dimension,
        })
    }

    /// One request under the per-call deadline.
    async fn request(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(self.config.effective_model())
            .input(vec![text.to_string()]);
        if self.config.provider_preset.supports_dimensions() {
            args.dimensions(self.dimension as u32);
        }
        let request = args.build().map_err(|e| EmbeddingError::Config(e.to_string()))?;

        let embeddings = self.client.embeddings();
        let call = embeddings.create(request);
        let response = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), call)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.config.timeout_secs))?
            .map_err(|e| EmbeddingError::Backend {
                backend: "openai".to_string(),
                reason: e.to_string(),
            })?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Backend {
                backend: "openai".to_string(),
                reason: "No embedding returned".to_string(),
            })?;
        fit_dimension(vector, self.dimension)
    }

    /// Retry with exponential backoff. Dimension and configuration errors are
    /// not retried.
    async fn retry_with_backoff(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut attempt = 0;
        let mut backoff = self.config.initial_backoff_ms;

        loop {
            match self.request(text).await {
                Ok(vector) => return Ok(vector),
                Err(e @ (EmbeddingError::Dimension { .. } | EmbeddingError::Config(_))) => {
                    return Err(e)
                }
                Err(e) if attempt >= self.config.max_retries => return Err(e),
                Err(e) => {
                    warn!("Embedding request failed (attempt {}): {}", attempt + 1, e);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff = next_backoff(
                        backoff,
                        self.config.exponential_base,
                        self.config.max_backoff_ms,
                    );
                    attempt += 1;
                }
            }
        }
    }
}

fn next_backoff(current_ms: u64, base: f64, max_ms: u64) -> u64 {
    ((current_ms as f64 * base) as u64).min(max_ms)
}

#[async_trait]
impl EmbeddingBackend for OpenAIBackend {
    async fn encode(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        EMBEDDING_REQUESTS.inc();
        let start = Instant::now();

        let result = self.retry_with_backoff(text).await;

        EMBEDDING_LATENCY.observe(start.elapsed().as_secs_f64());
        debug!(chars = text.len(), ok = result.is_ok(), "remote embedding call");
        result
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }

    async fn health_check(&self) -> HealthStatus {
        // single attempt; the run itself retries
        match self.request("health check").await {
            Ok(_) => HealthStatus::Healthy,
            Err(EmbeddingError::Timeout(secs)) => HealthStatus::Degraded {
                reason: format!("health check timed out after {}s", secs),
            },
            Err(e) if e.to_string().contains("rate_limit") => HealthStatus::Degraded {
                reason: "Rate limited".to_string(),
            },
            Err(e) => HealthStatus::Unhealthy {
                error: e.to_string(),
            },
        }
    }
}
