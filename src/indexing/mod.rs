//! Repository ingestion
//!
//! - `walker` - file discovery and reading
//! - `pipeline` - parse, resolve, embed and persist
//! - `errors` - per-file failure collection

pub mod errors;
pub mod pipeline;
pub mod walker;

pub use errors::{ErrorCollector, ErrorReport, FileError, ProcessingStage};
pub use pipeline::{IndexOptions, IndexSummary, Indexer, RepositoryGraph};
pub use walker::{content_hash, SourceFile, Walker};
