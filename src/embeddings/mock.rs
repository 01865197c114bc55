use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::provider::{EmbeddingBackend, HealthStatus};
use crate::error::{EmbeddingError, EmbeddingResult};

/// Deterministic backend: the same text always maps to the same unit vector.
///
/// Used for tests and offline runs. Failures can be injected per text or for
/// the whole backend.
pub struct MockBackend {
    dimension: usize,
    fail_marker: Option<String>,
    unreachable: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_marker: None,
            unreachable: false,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Fail every call whose text contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Fail every call, including the health check.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `encode` calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn text_to_vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            vector.push(((seed / 65536) % 1000) as f32 / 1000.0);
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in vector.iter_mut() {
                *v /= magnitude;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingBackend for MockBackend {
    async fn encode(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable {
            return Err(EmbeddingError::Backend {
                backend: "mock".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(EmbeddingError::Backend {
                    backend: "mock".to_string(),
                    reason: format!("refused text containing '{}'", marker),
                });
            }
        }
        Ok(self.text_to_vector(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> HealthStatus {
        if self.unreachable {
            HealthStatus::Unhealthy {
                error: "connection refused".to_string(),
            }
        } else {
            HealthStatus::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_deterministic() {
        let backend = MockBackend::new(768);
        let a = backend.encode("test text").await.unwrap();
        let b = backend.encode("test text").await.unwrap();
        assert_eq!(a, b, "Same text should produce same vector");
        assert_ne!(a, backend.encode("other text").await.unwrap());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_normalized() {
        let backend = MockBackend::new(768);
        let v = backend.encode("test").await.unwrap();
        assert_eq!(v.len(), 768);
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5, "Vector should be normalized");
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = MockBackend::new(8).failing_on("BOOM");
        assert!(backend.encode("fine").await.is_ok());
        assert!(backend.encode("goes BOOM here").await.is_err());
        assert!(backend.health_check().await.is_usable());

        let down = MockBackend::new(8).unreachable();
        assert!(down.encode("anything").await.is_err());
        assert!(!down.health_check().await.is_usable());
    }
}
