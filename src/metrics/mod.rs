//! # Metrics Collection Module
//!
//! Prometheus export for admission and routing decisions.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `switchyard_admission_total{endpoint, tier, outcome}` - Admission checks
//! - `switchyard_routing_decisions_total{model, tier}` - Routing decisions by winner
//! - `switchyard_routing_errors_total{error_type}` - Rejected routing requests
//! - `switchyard_storage_failovers_total{backend}` - Shared store failures absorbed
//!
//! **Histograms:**
//! - `switchyard_admission_duration_seconds` - Time spent in an admission check
//! - `switchyard_routing_duration_seconds` - Time spent scoring models

pub mod handler;

// Re-export PrometheusBuilder for test compatibility
pub use metrics_exporter_prometheus::PrometheusBuilder;

use crate::tier::{Endpoint, Tier};
use std::time::{Duration, Instant};

/// Holds the Prometheus handle and process start time.
pub struct MetricsCollector {
    /// Startup time for uptime calculation
    start_time: Instant,
    /// Prometheus handle for rendering metrics
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        start_time: Instant,
        prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        Self {
            start_time,
            prometheus_handle,
        }
    }

    /// Get uptime in seconds since startup.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Initialize the Prometheus recorder with sub-millisecond histogram buckets.
///
/// Both decisions are in-process computations, so the buckets start at 10µs.
/// Admission checks against Redis land in the upper buckets.
pub fn setup_metrics(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let decision_buckets = &[
        0.00001, 0.000025, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025,
        0.05, 0.1,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("switchyard_admission_duration_seconds".to_string()),
            decision_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("switchyard_routing_duration_seconds".to_string()),
            decision_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Record one admission check.
pub fn record_admission(endpoint: Endpoint, tier: Tier, allowed: bool, elapsed: Duration) {
    let outcome = if allowed { "allowed" } else { "denied" };
    metrics::counter!(
        "switchyard_admission_total",
        "endpoint" => endpoint.as_str(),
        "tier" => tier.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("switchyard_admission_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record one routing decision.
pub fn record_routing(model: &str, tier: Tier, elapsed: Duration) {
    metrics::counter!(
        "switchyard_routing_decisions_total",
        "model" => model.to_string(),
        "tier" => tier.as_str()
    )
    .increment(1);
    metrics::histogram!("switchyard_routing_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record a routing request that produced no decision.
pub fn record_routing_error(error_type: &'static str) {
    metrics::counter!("switchyard_routing_errors_total", "error_type" => error_type).increment(1);
}
