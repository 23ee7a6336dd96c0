//! Service metrics and periodic summaries.

use crate::types::response::PredictionResult;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the prediction service
pub struct ServiceMetrics {
    /// Requests answered with a prediction
    pub predictions_served: AtomicU64,
    /// Requests rejected as malformed
    pub requests_rejected: AtomicU64,
    /// Requests that failed inside the service
    pub requests_failed: AtomicU64,
    /// Predictions whose vote was unanimous
    unanimous_votes: AtomicU64,
    /// Predictions per winning label
    predictions_by_label: RwLock<BTreeMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            unanimous_votes: AtomicU64::new(0),
            predictions_by_label: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, result: &PredictionResult) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if result.confidence.is_unanimous() {
            self.unanimous_votes.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut by_label) = self.predictions_by_label.write() {
            *by_label.entry(result.prediction.clone()).or_insert(0) += 1;
        }

        self.record_time(processing_time);
    }

    /// Record a request rejected as malformed
    pub fn record_rejection(&self, processing_time: Duration) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);
    }

    /// Record a request that failed server-side
    pub fn record_failure(&self, processing_time: Duration) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.predictions_served.load(Ordering::Relaxed)
            + self.requests_rejected.load(Ordering::Relaxed)
            + self.requests_failed.load(Ordering::Relaxed)
    }

    /// Fraction of served predictions where every classifier agreed
    pub fn unanimity_rate(&self) -> f64 {
        let served = self.predictions_served.load(Ordering::Relaxed);
        if served == 0 {
            return 0.0;
        }
        self.unanimous_votes.load(Ordering::Relaxed) as f64 / served as f64
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => {
                let mut sorted = times.clone();
                sorted.sort_unstable();
                sorted
            }
            _ => return ProcessingStats::default(),
        };

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_requests() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_predictions_by_label(&self) -> BTreeMap<String, u64> {
        self.predictions_by_label
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            served,
            rejected,
            failed,
            throughput = format!("{:.1} req/s", self.get_throughput()),
            unanimous = format!("{:.1}%", self.unanimity_rate() * 100.0),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Service metrics summary"
        );

        for (label, count) in self.get_predictions_by_label() {
            let pct = if served > 0 {
                (count as f64 / served as f64) * 100.0
            } else {
                0.0
            };
            info!(label = %label, count, share = format!("{:.1}%", pct), "Predictions by label");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::ClassifierId;
    use crate::types::response::{Confidence, VotingMethod};

    fn result(label: &str, count: usize, total: usize) -> PredictionResult {
        PredictionResult {
            prediction: label.to_string(),
            confidence: Confidence::from_votes(count, total),
            individual_predictions: vec![(ClassifierId::RandomForest, label.to_string())],
            voting_method: VotingMethod::Majority,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &result("flu", 3, 3));
        metrics.record_prediction(Duration::from_micros(200), &result("flu", 2, 3));
        metrics.record_prediction(Duration::from_micros(300), &result("cold", 3, 3));
        metrics.record_rejection(Duration::from_micros(10));
        metrics.record_failure(Duration::from_micros(20));

        assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.requests_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_requests(), 5);
        assert!((metrics.unanimity_rate() - 2.0 / 3.0).abs() < 1e-9);

        let by_label = metrics.get_predictions_by_label();
        assert_eq!(by_label.get("flu"), Some(&2));
        assert_eq!(by_label.get("cold"), Some(&1));
    }

    #[test]
    fn test_processing_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_rejection(Duration::from_micros(us));
        }
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }
}
