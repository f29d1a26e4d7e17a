/// Metrics and telemetry for Clipstream
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Publication protocol transitions
/// - Reaction outcomes
/// - Best-effort side effects that failed
/// - Counter drift repaired by reconciliation
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // ========== Core Metrics ==========

    /// Publication protocol transitions by stage (begun, published, deleted, discarded)
    pub static ref PUBLICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "publications_total",
        "Total number of publication protocol transitions",
        &["stage"]
    )
    .unwrap();

    /// Reaction requests by kind and outcome
    pub static ref REACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reactions_total",
        "Total number of reaction requests",
        &["kind", "outcome"]
    )
    .unwrap();

    /// Best-effort side effects that failed (index notify, asset cleanup, owner counter)
    pub static ref SIDE_EFFECT_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "side_effect_failures_total",
        "Total number of failed best-effort side effects",
        &["effect"]
    )
    .unwrap();

    /// Rows whose cached counters were rewritten by reconciliation
    pub static ref COUNTER_REPAIRS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "counter_repairs_total",
        "Total number of rows repaired by counter reconciliation",
        &["scope"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a publication protocol transition
pub fn record_publication(stage: &str) {
    PUBLICATIONS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record several transitions of the same stage at once
pub fn record_publications(stage: &str, count: u64) {
    PUBLICATIONS_TOTAL.with_label_values(&[stage]).inc_by(count);
}

/// Record a reaction outcome
pub fn record_reaction(kind: &str, outcome: &str) {
    REACTIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Record a failed best-effort side effect
pub fn record_side_effect_failure(effect: &str) {
    SIDE_EFFECT_FAILURES_TOTAL.with_label_values(&[effect]).inc();
}

/// Record rows repaired by reconciliation
pub fn record_counter_repairs(scope: &str, rows: u64) {
    COUNTER_REPAIRS_TOTAL.with_label_values(&[scope]).inc_by(rows);
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_metrics() {
        record_publication("begun");
        record_reaction("up", "created");
        record_side_effect_failure("asset_cleanup");
        record_counter_repairs("content", 2);

        let output = render_metrics();
        assert!(output.contains("publications_total"));
        assert!(output.contains("reactions_total"));
        assert!(output.contains("side_effect_failures_total"));
        assert!(output.contains("counter_repairs_total"));
    }
}
