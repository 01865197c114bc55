//! Per-file failure collection for an ingestion run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Stage where a file failed.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub enum ProcessingStage {
    FileRead,
    Parsing,
    Resolution,
    Embedding,
    Storage,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::FileRead => write!(f, "File Read"),
            ProcessingStage::Parsing => write!(f, "Parsing"),
            ProcessingStage::Resolution => write!(f, "Resolution"),
            ProcessingStage::Embedding => write!(f, "Embedding"),
            ProcessingStage::Storage => write!(f, "Storage"),
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    /// Repository-relative path
    pub path: String,
    pub error: String,
    pub stage: ProcessingStage,
}

/// Thread-safe sink for per-file failures. Cloning shares the sink.
#[derive(Clone, Default)]
pub struct ErrorCollector {
    errors: Arc<Mutex<Vec<FileError>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    // a panic elsewhere must not lose the errors gathered so far
    fn lock(&self) -> MutexGuard<'_, Vec<FileError>> {
        self.errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, path: impl Into<String>, error: impl std::fmt::Display, stage: ProcessingStage) {
        self.lock().push(FileError {
            path: path.into(),
            error: error.to_string(),
            stage,
        });
    }

    pub fn error_count(&self) -> usize {
        self.lock().len()
    }

    pub fn get_report(&self) -> ErrorReport {
        ErrorReport::from_errors(&self.lock())
    }
}

/// Failures grouped by stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorReport {
    pub total_errors: usize,
    pub by_stage: BTreeMap<ProcessingStage, Vec<FileError>>,
    pub summary: String,
}

impl ErrorReport {
    pub fn from_errors(errors: &[FileError]) -> Self {
        let mut by_stage: BTreeMap<ProcessingStage, Vec<FileError>> = BTreeMap::new();
        for error in errors {
            by_stage.entry(error.stage).or_default().push(error.clone());
        }

        let summary = if errors.is_empty() {
            "No errors occurred during indexing".to_string()
        } else {
            format!("Indexing completed with {} errors", errors.len())
        };

        Self {
            total_errors: errors.len(),
            by_stage,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn count(&self, stage: ProcessingStage) -> usize {
        self.by_stage.get(&stage).map_or(0, Vec::len)
    }

    /// Print the summary with up to five examples per stage.
    pub fn print_summary(&self) {
        if self.total_errors == 0 {
            println!("✅ {}", self.summary);
            return;
        }

        println!("⚠️  {}", self.summary);
        println!();

        for (stage, errors) in &self.by_stage {
            println!("  {}: {} errors", stage, errors.len());
            for error in errors.iter().take(5) {
                println!("    - {}: {}", error.path, error.error);
            }
            if errors.len() > 5 {
                println!("    ... and {} more", errors.len() - 5);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_across_clones() {
        let collector = ErrorCollector::new();
        let shared = collector.clone();
        shared.record("a.py", "invalid syntax", ProcessingStage::Parsing);
        collector.record("b.bin", "not UTF-8", ProcessingStage::FileRead);
        collector.record("c.py", "invalid syntax", ProcessingStage::Parsing);

        let report = collector.get_report();
        assert_eq!(report.total_errors, 3);
        assert_eq!(report.count(ProcessingStage::Parsing), 2);
        assert_eq!(report.count(ProcessingStage::Embedding), 0);
        assert!(report.summary.contains("3 errors"));
    }

    #[test]
    fn test_empty_report() {
        let report = ErrorCollector::new().get_report();
        assert!(!report.has_errors());
    }
}
