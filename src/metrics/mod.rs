//! Prometheus metrics for repoindex
//!
//! Counters and histograms for parsing, dependency resolution, embedding
//! and search.

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Parse metrics
    // ============================================================================

    pub static ref FILES_PARSED: Counter = Counter::with_opts(
        Opts::new("repoindex_files_parsed_total", "Files handed to a structural parser")
    ).expect("Failed to create FILES_PARSED counter");

    pub static ref PARSE_ERRORS: Counter = Counter::with_opts(
        Opts::new("repoindex_parse_errors_total", "Files whose parse reported an error")
    ).expect("Failed to create PARSE_ERRORS counter");

    // ============================================================================
    // Resolution metrics
    // ============================================================================

    pub static ref IMPORTS_RESOLVED: Counter = Counter::with_opts(
        Opts::new("repoindex_imports_resolved_total", "Imports resolved to a file in the repository")
    ).expect("Failed to create IMPORTS_RESOLVED counter");

    pub static ref IMPORTS_EXTERNAL: Counter = Counter::with_opts(
        Opts::new("repoindex_imports_external_total", "Imports classified as external references")
    ).expect("Failed to create IMPORTS_EXTERNAL counter");

    // ============================================================================
    // Index metrics
    // ============================================================================

    pub static ref INDEXED_FILES: Gauge = Gauge::with_opts(
        Opts::new("repoindex_indexed_files_total", "Files in the current index")
    ).expect("Failed to create INDEXED_FILES gauge");

    pub static ref EMBEDDED_UNITS: Gauge = Gauge::with_opts(
        Opts::new("repoindex_embedded_units_total", "Embedding records in the current index")
    ).expect("Failed to create EMBEDDED_UNITS gauge");

    pub static ref INDEX_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "repoindex_indexing_duration_seconds",
            "Time to index a repository in seconds"
        ).buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0])
    ).expect("Failed to create INDEX_LATENCY histogram");

    // ============================================================================
    // Embedding metrics
    // ============================================================================

    pub static ref EMBEDDING_REQUESTS: Counter = Counter::with_opts(
        Opts::new("repoindex_embedding_requests_total", "Encode calls issued to the embedding backend")
    ).expect("Failed to create EMBEDDING_REQUESTS counter");

    pub static ref EMBEDDING_FAILURES: Counter = Counter::with_opts(
        Opts::new("repoindex_embedding_failures_total", "Encode calls that failed and were skipped")
    ).expect("Failed to create EMBEDDING_FAILURES counter");

    pub static ref EMBEDDING_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "repoindex_embedding_latency_seconds",
            "Embedding call latency in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0])
    ).expect("Failed to create EMBEDDING_LATENCY histogram");

    // ============================================================================
    // Search metrics
    // ============================================================================

    pub static ref SEARCH_REQUESTS: Counter = Counter::with_opts(
        Opts::new("repoindex_search_requests_total", "Total number of search requests")
    ).expect("Failed to create SEARCH_REQUESTS counter");

    pub static ref SEARCH_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "repoindex_search_latency_seconds",
            "Search request latency in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("Failed to create SEARCH_LATENCY histogram");
}

/// Register all metrics with the global registry.
///
/// Call once at startup; a second call reports `AlreadyReg`.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(FILES_PARSED.clone()))?;
    REGISTRY.register(Box::new(PARSE_ERRORS.clone()))?;
    REGISTRY.register(Box::new(IMPORTS_RESOLVED.clone()))?;
    REGISTRY.register(Box::new(IMPORTS_EXTERNAL.clone()))?;
    REGISTRY.register(Box::new(INDEXED_FILES.clone()))?;
    REGISTRY.register(Box::new(EMBEDDED_UNITS.clone()))?;
    REGISTRY.register(Box::new(INDEX_LATENCY.clone()))?;
    REGISTRY.register(Box::new(EMBEDDING_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(EMBEDDING_FAILURES.clone()))?;
    REGISTRY.register(Box::new(EMBEDDING_LATENCY.clone()))?;
    REGISTRY.register(Box::new(SEARCH_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(SEARCH_LATENCY.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text exposition format.
///
/// Returns an empty string if encoding fails.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics contained invalid UTF-8: {}", e);
        String::new()
    })
}

/// Current metric values for the `stats` command.
pub struct MetricSnapshot {
    pub files_parsed: f64,
    pub parse_errors: f64,
    pub imports_resolved: f64,
    pub imports_external: f64,
    pub indexed_files: f64,
    pub embedded_units: f64,
    pub embedding_requests_total: f64,
    pub embedding_failures_total: f64,
    pub embedding_latency_avg: f64,
    pub search_requests_total: f64,
    pub search_latency_avg: f64,
}

impl MetricSnapshot {
    pub fn capture() -> Self {
        Self {
            files_parsed: FILES_PARSED.get(),
            parse_errors: PARSE_ERRORS.get(),
            imports_resolved: IMPORTS_RESOLVED.get(),
            imports_external: IMPORTS_EXTERNAL.get(),
            indexed_files: INDEXED_FILES.get(),
            embedded_units: EMBEDDED_UNITS.get(),
            embedding_requests_total: EMBEDDING_REQUESTS.get(),
            embedding_failures_total: EMBEDDING_FAILURES.get(),
            embedding_latency_avg: calculate_histogram_avg(&EMBEDDING_LATENCY),
            search_requests_total: SEARCH_REQUESTS.get(),
            search_latency_avg: calculate_histogram_avg(&SEARCH_LATENCY),
        }
    }
}

fn calculate_histogram_avg(histogram: &Histogram) -> f64 {
    let count = histogram.get_sample_count();
    if count == 0 {
        return 0.0;
    }
    histogram.get_sample_sum() / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increment() {
        let initial = IMPORTS_RESOLVED.get();
        IMPORTS_RESOLVED.inc();
        assert!(IMPORTS_RESOLVED.get() >= initial + 1.0);
    }

    #[test]
    fn test_histogram_observe() {
        let count_before = EMBEDDING_LATENCY.get_sample_count();
        EMBEDDING_LATENCY.observe(0.1);
        assert!(EMBEDDING_LATENCY.get_sample_count() > count_before);
    }

    #[test]
    fn test_gather_metrics() {
        let output = gather_metrics();
        assert!(output.is_empty() || output.contains("repoindex"));
    }

    #[test]
    fn test_metric_snapshot() {
        let snapshot = MetricSnapshot::capture();
        assert!(snapshot.files_parsed >= 0.0);
        assert!(snapshot.search_latency_avg >= 0.0);
    }
}
