mod chunking;
mod config;
mod fastembed_provider;
mod mock;
mod openai_provider;
mod pipeline;
mod provider;

// Re-export public interfaces
pub use chunking::{extract_lines, plan_units, sliding_windows, EmbeddingUnit, LineWindow};
pub use config::{
    EmbeddingsConfig, FastEmbedConfig, OpenAIConfig, ProviderPreset, ProviderType,
    EMBEDDING_DIMENSION,
};
pub use fastembed_provider::FastEmbedBackend;
pub use mock::MockBackend;
pub use openai_provider::OpenAIBackend;
pub use pipeline::{EmbeddingPipeline, EmbeddingReport};
pub use provider::{fit_dimension, EmbeddingBackend, HealthStatus};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Build the backend selected by `config.provider`.
pub fn create_backend(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingBackend>> {
    let backend: Arc<dyn EmbeddingBackend> = match config.provider {
        ProviderType::FastEmbed => Arc::new(FastEmbedBackend::new(&config.fastembed, config.dimension)?),
        ProviderType::OpenAI => Arc::new(OpenAIBackend::new(&config.openai, config.dimension)?),
        ProviderType::Mock => Arc::new(MockBackend::new(config.dimension)),
    };
    info!(
        backend = backend.backend_name(),
        dimension = backend.dimension(),
        "Embedding backend ready"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_backend() {
        let config = EmbeddingsConfig {
            provider: ProviderType::Mock,
            ..Default::default()
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.backend_name(), "mock");
        assert_eq!(backend.dimension(), EMBEDDING_DIMENSION);
    }

    #[test]
    fn test_create_fastembed_rejects_unknown_model() {
        let config = EmbeddingsConfig {
            fastembed: FastEmbedConfig {
                model: "no-such-model".into(),
                cache_dir: None,
            },
            ..Default::default()
        };
        assert!(create_backend(&config).is_err());
    }
}
