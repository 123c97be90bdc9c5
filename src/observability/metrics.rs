//! # Metrics
//!
//! Prometheus metrics for monitoring reconciliation.
//!
//! ## Metrics Exposed
//!
//! - `scaling_reconciler_remote_operations_total` - Remote API calls by resource kind and operation
//! - `scaling_reconciler_remote_operation_errors_total` - Failed remote API calls by resource kind and operation
//! - `scaling_reconciler_operation_duration_seconds` - Duration of adapter operations
//! - `scaling_reconciler_put_retries_total` - Put attempts retried while the remote converges
//! - `scaling_reconciler_absent_resources_total` - Reads and deletes that found the resource already gone
//! - `scaling_reconciler_transitions_total` - State transitions applied by the reconciler

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REMOTE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "scaling_reconciler_remote_operations_total",
            "Total number of remote API operations by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "scaling_reconciler_remote_operation_errors_total",
            "Total number of failed remote API operations by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "scaling_reconciler_operation_duration_seconds",
            "Duration of adapter operations in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 30.0, 120.0, 300.0]),
        &["kind", "operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static PUT_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "scaling_reconciler_put_retries_total",
            "Total number of put attempts retried while the remote service converges",
        ),
        &["kind"],
    )
    .expect("Failed to create PUT_RETRIES_TOTAL metric - this should never happen")
});

static ABSENT_RESOURCES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "scaling_reconciler_absent_resources_total",
            "Total number of reads and deletes that found the resource already gone",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create ABSENT_RESOURCES_TOTAL metric - this should never happen")
});

static TRANSITIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "scaling_reconciler_transitions_total",
            "Total number of state transitions applied by the reconciler",
        ),
        &["transition"],
    )
    .expect("Failed to create TRANSITIONS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Calling this more than once is harmless.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    let collectors: [Box<dyn prometheus::core::Collector>; 6] = [
        Box::new(REMOTE_OPERATIONS_TOTAL.clone()),
        Box::new(REMOTE_OPERATION_ERRORS_TOTAL.clone()),
        Box::new(OPERATION_DURATION.clone()),
        Box::new(PUT_RETRIES_TOTAL.clone()),
        Box::new(ABSENT_RESOURCES_TOTAL.clone()),
        Box::new(TRANSITIONS_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Render the registry in the Prometheus text exposition format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a remote operation and how long the surrounding adapter call took
pub fn record_remote_operation(kind: &str, operation: &str, duration: f64) {
    REMOTE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
    OPERATION_DURATION
        .with_label_values(&[kind, operation])
        .observe(duration);
}

pub fn increment_remote_operation_errors(kind: &str, operation: &str) {
    REMOTE_OPERATION_ERRORS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_put_retries(kind: &str) {
    PUT_RETRIES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_absent_resources(kind: &str, operation: &str) {
    ABSENT_RESOURCES_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_transitions(transition: &str) {
    TRANSITIONS_TOTAL.with_label_values(&[transition]).inc();
}
