// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the dbfence operator.
//!
//! All metrics carry the namespace prefix `dbfence_` and are exposed on the
//! `/metrics` endpoint served by the binary.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Outcome and duration of `Database` reconciliations
//! - **Allowlist Metrics** - Replace decisions and owned entry counts per service
//! - **Error Metrics** - Errors by kind
//!
//! # Example
//!
//! ```rust,no_run
//! use dbfence::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Database", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all dbfence metrics
const METRICS_NAMESPACE: &str = "dbfence";

/// Outcome label for a pass that issued a replace
pub const OUTCOME_REPLACED: &str = "replaced";

/// Outcome label for a pass that found the allowlist already converged
pub const OUTCOME_UNCHANGED: &str = "unchanged";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`Database`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Allowlist Metrics
// ============================================================================

/// Total number of convergence passes by replace decision
///
/// Labels:
/// - `outcome`: `replaced` or `unchanged`
pub static ALLOWLIST_REPLACEMENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_allowlist_replacements_total"),
        "Total number of convergence passes by replace decision",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Number of operator-owned entries on a service's allowlist after the last pass
///
/// Labels:
/// - `service_id`: Database service identifier
pub static OWNED_ENTRIES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_owned_entries"),
        "Number of operator-owned allowlist entries per database service",
    );
    let gauge = GaugeVec::new(opts, &["service_id"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Error kind (`cluster_misconfigured`, `remote_unavailable`, ...)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled (e.g., `Database`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record the replace decision of one convergence pass
///
/// # Arguments
/// * `service_id` - The converged service
/// * `replaced` - Whether a replace request was issued
/// * `owned_entries` - Owned entries in the allowlist after the pass
#[allow(clippy::cast_precision_loss)]
pub fn record_allowlist_pass(service_id: &str, replaced: bool, owned_entries: usize) {
    let outcome = if replaced {
        OUTCOME_REPLACED
    } else {
        OUTCOME_UNCHANGED
    };
    ALLOWLIST_REPLACEMENTS_TOTAL
        .with_label_values(&[outcome])
        .inc();
    OWNED_ENTRIES
        .with_label_values(&[service_id])
        .set(owned_entries as f64);
}

/// Forget the owned entry gauge of a released service
pub fn clear_owned_entries(service_id: &str) {
    let _ = OWNED_ENTRIES.remove_label_values(&[service_id]);
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where error occurred
/// * `error_type` - Category of error (see `AllowlistError::metric_label`)
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
