pub mod cli;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod indexing;
pub mod language;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod resolver;
pub mod search;
pub mod storage;

pub use config::Config;
pub use indexing::{IndexOptions, IndexSummary, Indexer};
pub use language::Language;
