use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embeddings::EmbeddingsConfig;

const CONFIG_DIR: &str = ".repoindex";
const CONFIG_FILE: &str = "config.toml";
const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// File extensions to index
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Patterns to ignore (in addition to .gitignore)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Number of parallel threads for parsing (None = auto-detect)
    #[serde(default)]
    pub parallel_threads: Option<usize>,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_patterns: default_ignore_patterns(),
            parallel_threads: None,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    [
        "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "go", "java", "rs", "c", "h",
        "cc", "cpp", "cxx", "hpp", "hh", "hxx", "php",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        "target".to_string(),
        ".git".to_string(),
        "dist".to_string(),
        "build".to_string(),
        "__pycache__".to_string(),
        ".venv".to_string(),
        "vendor".to_string(),
        CONFIG_DIR.to_string(),
    ]
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

/// Sliding-window limits for oversized classes, in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Classes spanning more lines than this are split into windows
    #[serde(default = "default_max_class_lines")]
    pub max_class_lines: usize,

    #[serde(default = "default_window_lines")]
    pub window_lines: usize,

    #[serde(default = "default_overlap_lines")]
    pub overlap_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_class_lines: default_max_class_lines(),
            window_lines: default_window_lines(),
            overlap_lines: default_overlap_lines(),
        }
    }
}

fn default_max_class_lines() -> usize {
    800
}

fn default_window_lines() -> usize {
    700
}

fn default_overlap_lines() -> usize {
    100
}

/// Hybrid ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Weight for vector similarity (normalized against keyword_weight)
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Weight for the lexical score (normalized against vector_weight)
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// BM25 term-frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// BM25 length normalization
    #[serde(default = "default_b")]
    pub b: f32,

    /// Multiplier applied when query terms appear in the file name
    #[serde(default = "default_filename_boost")]
    pub filename_boost: f32,

    /// Default number of results to return
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            k1: default_k1(),
            b: default_b(),
            filename_boost: default_filename_boost(),
            default_limit: default_search_limit(),
        }
    }
}

fn default_vector_weight() -> f32 {
    0.7
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_k1() -> f32 {
    1.5
}

fn default_b() -> f32 {
    0.75
}

fn default_filename_boost() -> f32 {
    1.3
}

fn default_search_limit() -> usize {
    10
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write logs to rotating files
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// Also write logs to stderr (filtered by RUST_LOG)
    #[serde(default = "default_logging_stderr")]
    pub stderr: bool,

    /// File log level: trace, debug, info, warn, error
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Log directory, relative to the project root unless absolute
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_logging_file_prefix")]
    pub file_prefix: String,

    /// daily, hourly, minutely or never
    #[serde(default = "default_logging_rotation")]
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            stderr: default_logging_stderr(),
            level: default_logging_level(),
            directory: default_logging_directory(),
            file_prefix: default_logging_file_prefix(),
            rotation: default_logging_rotation(),
        }
    }
}

fn default_logging_enabled() -> bool {
    false
}

fn default_logging_stderr() -> bool {
    true
}

fn default_logging_level() -> String {
    "debug".to_string()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("logs")
}

fn default_logging_file_prefix() -> String {
    "repoindex.log".to_string()
}

fn default_logging_rotation() -> String {
    "daily".to_string()
}

impl Config {
    /// Load configuration from the .repoindex directory
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the .repoindex directory
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join(CONFIG_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the .repoindex directory
    pub fn repoindex_dir(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR)
    }

    /// Get the path to the JSON document store
    pub fn index_path(root: &Path) -> PathBuf {
        Self::repoindex_dir(root).join(INDEX_FILE)
    }

    /// Check if repoindex is initialized in the given directory
    pub fn is_initialized(root: &Path) -> bool {
        Self::repoindex_dir(root).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::ProviderType;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.indexer.extensions.contains(&"rs".to_string()));
        assert!(config.indexer.extensions.contains(&"py".to_string()));
        assert_eq!(config.indexer.max_file_bytes, 1024 * 1024);
        assert_eq!(config.chunking.max_class_lines, 800);
        assert_eq!(config.chunking.window_lines, 700);
        assert_eq!(config.chunking.overlap_lines, 100);
        assert_eq!(config.embeddings.provider, ProviderType::FastEmbed);
        assert_eq!(config.embeddings.dimension, 768);
        assert_eq!(config.embeddings.batch_files, 8);
        assert!((config.search.vector_weight - 0.7).abs() < 0.001);
        assert!((config.search.keyword_weight - 0.3).abs() < 0.001);
        assert!((config.search.filename_boost - 1.3).abs() < 0.001);
        assert_eq!(config.search.default_limit, 10);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.embeddings.provider = ProviderType::Mock;
        config.search.keyword_weight = 0.5;

        config.save(dir.path()).unwrap();
        assert!(Config::is_initialized(dir.path()));
        let loaded = Config::load(dir.path()).unwrap();

        assert_eq!(config.indexer.extensions, loaded.indexer.extensions);
        assert_eq!(loaded.embeddings.provider, ProviderType::Mock);
        assert!((loaded.search.keyword_weight - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_dir = Config::repoindex_dir(dir.path());
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[chunking]\nwindow_lines = 300\n\n[embeddings]\nprovider = \"mock\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.chunking.window_lines, 300);
        assert_eq!(config.chunking.max_class_lines, 800);
        assert_eq!(config.embeddings.provider, ProviderType::Mock);
        assert_eq!(config.embeddings.dimension, 768);
    }

    #[test]
    fn test_load_missing_config_returns_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.search.default_limit, 10);
        assert!(!Config::is_initialized(dir.path()));
    }
}
