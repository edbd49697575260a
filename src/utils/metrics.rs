use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Extraction run metrics collector, shared between batch workers
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    /// In-memory metrics store
    metrics: Arc<Mutex<Metrics>>,
}

/// Metrics data structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metrics {
    /// Start time of the metrics collection
    pub start_time: DateTime<Utc>,

    /// Total documents processed
    pub documents_processed: usize,

    /// Documents that produced a valid listing
    pub successful_extractions: usize,

    /// Documents that failed the completeness gate
    pub failed_extractions: usize,

    /// Failure counts keyed by error kind
    pub failures_by_kind: HashMap<String, usize>,

    /// Extraction durations in milliseconds, keyed by source
    pub durations: HashMap<String, u64>,

    /// Accepted image counts across successful extractions
    pub total_images_accepted: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let metrics = Metrics {
            start_time: Utc::now(),
            ..Default::default()
        };

        Self {
            metrics: Arc::new(Mutex::new(metrics)),
        }
    }

    /// Record one extraction attempt
    pub async fn record_extraction(
        &self,
        source: &str,
        success: bool,
        error_kind: Option<&str>,
        images_accepted: usize,
        duration_ms: u64,
    ) {
        let mut metrics = self.metrics.lock().await;

        metrics.documents_processed += 1;

        if success {
            metrics.successful_extractions += 1;
            metrics.total_images_accepted += images_accepted;
        } else {
            metrics.failed_extractions += 1;
            if let Some(kind) = error_kind {
                *metrics.failures_by_kind.entry(kind.to_string()).or_default() += 1;
            }
        }

        metrics.durations.insert(source.to_string(), duration_ms);
    }

    /// Start timing an extraction
    pub fn start_timer(&self) -> ExtractionTimer {
        ExtractionTimer {
            start: Instant::now(),
        }
    }

    /// Get all metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.lock().await.clone()
    }

    /// Reset metrics
    pub async fn reset(&self) {
        let mut metrics = self.metrics.lock().await;
        *metrics = Metrics {
            start_time: Utc::now(),
            ..Default::default()
        };
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer for measuring a single extraction
pub struct ExtractionTimer {
    /// Start time of the extraction
    start: Instant,
}

impl ExtractionTimer {
    /// End timing and get the duration in milliseconds
    pub fn end(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let collector = MetricsCollector::new();
        collector.record_extraction("a.html", true, None, 4, 12).await;
        collector
            .record_extraction("b.html", false, Some("missing_required_field"), 0, 8)
            .await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.documents_processed, 2);
        assert_eq!(metrics.successful_extractions, 1);
        assert_eq!(metrics.failed_extractions, 1);
        assert_eq!(metrics.total_images_accepted, 4);
        assert_eq!(metrics.failures_by_kind.get("missing_required_field"), Some(&1));
    }

    #[tokio::test]
    async fn test_reset_clears_counts() {
        let collector = MetricsCollector::new();
        collector.record_extraction("a.html", true, None, 2, 5).await;
        collector.reset().await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.documents_processed, 0);
        assert!(metrics.durations.is_empty());
    }
}
