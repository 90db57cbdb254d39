//! Metrics and observability utilities
//!
//! Prometheus-style metrics through the `metrics` facade. Recording is a no-op
//! until an exporter is installed, so library code records unconditionally.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::{Duration, Instant};

pub const REQUESTS_TOTAL: &str = "cocite_requests_total";
pub const REQUEST_DURATION: &str = "cocite_request_duration_seconds";
pub const FETCH_TOTAL: &str = "cocite_eutils_fetch_total";
pub const FETCH_RETRIES_TOTAL: &str = "cocite_eutils_fetch_retries_total";
pub const BUILD_DURATION: &str = "cocite_network_build_duration_seconds";
pub const BUILD_DEGRADED_TOTAL: &str = "cocite_network_build_degraded_total";
pub const BRANCH_TIMEOUTS_TOTAL: &str = "cocite_network_branch_timeouts_total";
pub const CACHE_HITS_TOTAL: &str = "cocite_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "cocite_cache_misses_total";

/// Lower buckets for network build latency (in seconds)
const BUILD_BUCKETS: &[f64] = &[
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    20.00, // 20s
    30.00, // 30s
    60.00, // 60s
];

/// Build latency buckets, topped by the configured build budget
pub fn build_buckets(budget: Duration) -> Vec<f64> {
    let budget = budget.as_secs_f64();
    let mut buckets: Vec<f64> = BUILD_BUCKETS.iter().copied().filter(|b| *b < budget).collect();
    buckets.push(budget);
    buckets
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(REQUESTS_TOTAL, Unit::Count, "Total number of HTTP requests");

    describe_histogram!(
        REQUEST_DURATION,
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        FETCH_TOTAL,
        Unit::Count,
        "E-utilities fetches by outcome (ok, rate_limited, timeout, connection, client)"
    );

    describe_counter!(
        FETCH_RETRIES_TOTAL,
        Unit::Count,
        "E-utilities retries caused by rate limiting"
    );

    describe_histogram!(
        BUILD_DURATION,
        Unit::Seconds,
        "Citation network build latency in seconds"
    );

    describe_counter!(
        BUILD_DEGRADED_TOTAL,
        Unit::Count,
        "Citation network builds returned with an error summary"
    );

    describe_counter!(
        BRANCH_TIMEOUTS_TOTAL,
        Unit::Count,
        "Fan-out lookups aborted at their stage deadline"
    );

    describe_counter!(CACHE_HITS_TOTAL, Unit::Count, "Total cache hits");

    describe_counter!(CACHE_MISSES_TOTAL, Unit::Count, "Total cache misses");

    tracing::info!("Metrics registered");
}

pub fn record_fetch(outcome: &'static str) {
    counter!(FETCH_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_fetch_retry() {
    counter!(FETCH_RETRIES_TOTAL).increment(1);
}

pub fn record_branch_timeout(stage: &'static str) {
    counter!(BRANCH_TIMEOUTS_TOTAL, "stage" => stage).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!(CACHE_HITS_TOTAL).increment(1);
    } else {
        counter!(CACHE_MISSES_TOTAL).increment(1);
    }
}

/// Record a finished network build
pub fn record_build(started: Instant, degraded: bool) {
    histogram!(BUILD_DURATION).record(started.elapsed().as_secs_f64());
    if degraded {
        counter!(BUILD_DEGRADED_TOTAL).increment(1);
    }
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
            REQUESTS_TOTAL,
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            REQUEST_DURATION,
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_share_prefix() {
        for name in [
            REQUESTS_TOTAL,
            FETCH_TOTAL,
            FETCH_RETRIES_TOTAL,
            BUILD_DURATION,
            BUILD_DEGRADED_TOTAL,
            BRANCH_TIMEOUTS_TOTAL,
            CACHE_HITS_TOTAL,
            CACHE_MISSES_TOTAL,
        ] {
            assert!(name.starts_with("cocite_"));
        }
    }

    #[test]
    fn test_build_buckets_end_at_budget() {
        let buckets = build_buckets(Duration::from_secs(80));
        assert_eq!(buckets.last(), Some(&80.0));
        assert!(buckets.contains(&60.0));
        assert!(buckets.windows(2).all(|w| w[0] < w[1]));

        let short = build_buckets(Duration::from_secs(5));
        assert_eq!(short, vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0]);
    }

    #[test]
    fn test_recording_without_exporter_is_noop() {
        record_fetch("ok");
        record_cache_lookup(true);
        record_build(Instant::now(), true);
        RequestMetrics::start("GET", "/health").finish(200);
    }
}
