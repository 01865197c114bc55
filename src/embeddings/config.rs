use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Width of every stored vector.
pub const EMBEDDING_DIMENSION: usize = 768;

/// Which embedding backend a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    FastEmbed,
    OpenAI,
    /// Deterministic hash vectors; no model or network
    Mock,
}

impl Default for ProviderType {
    fn default() -> Self {
        Self::FastEmbed
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FastEmbed => write!(f, "fastembed"),
            Self::OpenAI => write!(f, "openai"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// `[embeddings]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: ProviderType,

    /// Vector width; remote vectors are truncated to it
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Files embedded concurrently per batch
    #[serde(default = "default_batch_files")]
    pub batch_files: usize,

    /// Upper bound on outstanding backend calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default)]
    pub fastembed: FastEmbedConfig,

    #[serde(default)]
    pub openai: OpenAIConfig,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            dimension: default_dimension(),
            batch_files: default_batch_files(),
            max_in_flight: default_max_in_flight(),
            fastembed: FastEmbedConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

fn default_dimension() -> usize {
    EMBEDDING_DIMENSION
}

fn default_batch_files() -> usize {
    8
}

fn default_max_in_flight() -> usize {
    8
}

/// FastEmbed provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastEmbedConfig {
    #[serde(default = "default_fastembed_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model: default_fastembed_model(),
            cache_dir: None,
        }
    }
}

fn default_fastembed_model() -> String {
    "nomic-embed-text-v1.5".to_string()
}

/// OpenAI-compatible hosts with a known endpoint and embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreset {
    OpenAI,
    Gemini,
    Together,
    Fireworks,
}

impl Default for ProviderPreset {
    fn default() -> Self {
        Self::OpenAI
    }
}

impl ProviderPreset {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai/",
            Self::Together => "https://api.together.xyz/v1",
            Self::Fireworks => "https://api.fireworks.ai/inference/v1",
        }
    }

    pub fn embedding_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "text-embedding-3-small",
            Self::Gemini => "text-embedding-004",
            Self::Together => "togethercomputer/m2-bert-80M-32k-retrieval",
            Self::Fireworks => "nomic-ai/nomic-embed-text-v1.5",
        }
    }

    /// Whether the host honours the `dimensions` request field.
    pub fn supports_dimensions(&self) -> bool {
        matches!(self, Self::OpenAI)
    }

    pub fn from_name(name: &str) -> EmbeddingResult<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "together" => Ok(Self::Together),
            "fireworks" => Ok(Self::Fireworks),
            other => Err(EmbeddingError::Config(format!(
                "Unknown provider: '{}'. Available: openai, gemini, together, fireworks",
                other
            ))),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub provider_preset: ProviderPreset,

    /// API key (can be environment variable reference like ${OPENAI_API_KEY})
    #[serde(default)]
    pub api_key: String,

    /// Overrides the preset's embedding model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Overrides the preset's endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Deadline for a single embedding call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            provider_preset: ProviderPreset::default(),
            api_key: String::new(),
            model: None,
            base_url: None,
            organization: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            exponential_base: default_exponential_base(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10000
}

fn default_exponential_base() -> f64 {
    2.0
}

impl OpenAIConfig {
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider_preset.embedding_model())
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider_preset.base_url())
    }

    /// Load API key from configuration or environment variable
    pub fn load_api_key(&self) -> EmbeddingResult<String> {
        // 1. Explicit configuration
        if !self.api_key.is_empty() && !self.api_key.starts_with("${") {
            return Ok(self.api_key.clone());
        }

        // 2. Environment variable reference
        if self.api_key.starts_with("${") && self.api_key.ends_with('}') {
            let var_name = &self.api_key[2..self.api_key.len() - 1];
            return std::env::var(var_name).map_err(|_| {
                EmbeddingError::Config(format!("Environment variable {} not set", var_name))
            });
        }

        // 3. Standard environment variables
        std::env::var("REPOINDEX_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                EmbeddingError::Config(
                    "No API key configured and neither REPOINDEX_API_KEY nor OPENAI_API_KEY is set"
                        .to_string(),
                )
            })
    }
}
