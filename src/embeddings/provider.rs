use async_trait::async_trait;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Capability to turn a piece of text into a fixed-width vector.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Encode one unit of text. Failures are per call and never poison the
    /// backend for later calls.
    async fn encode(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Width of every vector `encode` returns.
    fn dimension(&self) -> usize;

    /// Backend name for logging and metrics
    fn backend_name(&self) -> &'static str;

    /// Check whether the backend can serve a run at all.
    async fn health_check(&self) -> HealthStatus {
        match self.encode("health check").await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy {
                error: e.to_string(),
            },
        }
    }
}

/// Health status reported before an embedding run
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded { reason: String },
    Unhealthy { error: String },
}

impl HealthStatus {
    /// Whether a run should be attempted.
    pub fn is_usable(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy { .. })
    }
}

/// Pin a vector to `dimension`: longer vectors are truncated, shorter ones
/// are rejected.
pub fn fit_dimension(mut vector: Vec<f32>, dimension: usize) -> EmbeddingResult<Vec<f32>> {
    if vector.len() < dimension {
        return Err(EmbeddingError::Dimension {
            expected: dimension,
            actual: vector.len(),
        });
    }
    vector.truncate(dimension);
    Ok(vector)
}
