//! Typed errors for the indexing stages.
//!
//! Per-file and per-unit failures are carried inside stage results; only the
//! variants surfaced here cross a stage boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by an embedding backend.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// A single encode call failed.
    #[error("embedding backend '{backend}' failed: {reason}")]
    Backend { backend: String, reason: String },

    /// A single encode call exceeded its deadline.
    #[error("embedding call timed out after {0}s")]
    Timeout(u64),

    /// The backend returned a vector of the wrong width.
    #[error("expected {expected}-dimensional vector, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// The backend cannot be reached for the whole run.
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    /// Backend configuration is invalid or incomplete.
    #[error("embedding backend misconfigured: {0}")]
    Config(String),
}

/// Failures in the dependency resolver that are logged and skipped.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("malformed alias configuration {path}: {reason}")]
    ConfigParse { path: String, reason: String },
}

/// Failures at the document store boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no record for {repo_id}:{path}")]
    NotFound { repo_id: String, path: String },
}

pub type EmbeddingResult<T> = std::result::Result<T, EmbeddingError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;
