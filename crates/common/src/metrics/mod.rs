//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all EnTrust metrics
pub const METRICS_PREFIX: &str = "entrust";

/// Buckets for report generation latency (long-running provider calls)
pub const GENERATION_BUCKETS: &[f64] = &[
    1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_reports_generated_total", METRICS_PREFIX),
        Unit::Count,
        "Total dimension reports generated"
    );

    describe_counter!(
        format!("{}_reports_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total dimension report generations that failed"
    );

    describe_histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-dimension report generation latency in seconds"
    );

    describe_counter!(
        format!("{}_provider_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total LLM provider calls"
    );

    describe_histogram!(
        format!("{}_provider_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "LLM provider call latency in seconds"
    );

    describe_counter!(
        format!("{}_storage_fallback_total", METRICS_PREFIX),
        Unit::Count,
        "Cloud storage writes recovered via local fallback"
    );

    describe_counter!(
        format!("{}_rag_degraded_total", METRICS_PREFIX),
        Unit::Count,
        "Report generations that ran without standards context"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record the outcome of one dimension generation
pub fn record_report(duration_secs: f64, dimension: &str, success: bool) {
    if success {
        counter!(
            format!("{}_reports_generated_total", METRICS_PREFIX),
            "dimension" => dimension.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_reports_failed_total", METRICS_PREFIX),
            "dimension" => dimension.to_string()
        )
        .increment(1);
    }

    histogram!(
        format!("{}_report_duration_seconds", METRICS_PREFIX),
        "dimension" => dimension.to_string()
    )
    .record(duration_secs);
}

/// Record an LLM provider call
pub fn record_provider_call(duration_secs: f64, provider: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_provider_calls_total", METRICS_PREFIX),
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_provider_duration_seconds", METRICS_PREFIX),
        "provider" => provider.to_string()
    )
    .record(duration_secs);
}

/// Record a cloud write recovered through local fallback
pub fn record_storage_fallback(backend: &str) {
    counter!(
        format!("{}_storage_fallback_total", METRICS_PREFIX),
        "backend" => backend.to_string()
    )
    .increment(1);
}

/// Record a generation that ran without standards context
pub fn record_rag_degraded(dimension: &str) {
    counter!(
        format!("{}_rag_degraded_total", METRICS_PREFIX),
        "dimension" => dimension.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in GENERATION_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/v1/customers/ACME/reports");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
