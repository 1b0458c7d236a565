//! # Transaction Buffer Client Metrics
//!
//! Prometheus metrics for end-of-transaction requests.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! txn-buffer-client = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `txn_buffer_requests_submitted_total` - Requests handed to a connection (by action)
//! - `txn_buffer_requests_succeeded_total` - Requests acknowledged by the broker (by action)
//! - `txn_buffer_requests_failed_total` - Failed requests (by error kind)
//! - `txn_buffer_pending_requests` - Requests currently awaiting a reply
//! - `txn_buffer_request_latency_seconds` - Submit-to-reply latency of successful requests

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Requests handed to a connection, labeled by action
    pub static ref REQUESTS_SUBMITTED: IntCounterVec = register_int_counter_vec!(
        "txn_buffer_requests_submitted_total",
        "Total number of end-of-transaction requests submitted",
        &["action"]
    )
    .expect("Failed to create REQUESTS_SUBMITTED metric");

    /// Requests acknowledged by the owning broker, labeled by action
    pub static ref REQUESTS_SUCCEEDED: IntCounterVec = register_int_counter_vec!(
        "txn_buffer_requests_succeeded_total",
        "Total number of end-of-transaction requests acknowledged",
        &["action"]
    )
    .expect("Failed to create REQUESTS_SUCCEEDED metric");

    /// Failed requests, labeled by error kind
    pub static ref REQUESTS_FAILED: IntCounterVec = register_int_counter_vec!(
        "txn_buffer_requests_failed_total",
        "Total number of failed end-of-transaction requests",
        &["kind"]
    )
    .expect("Failed to create REQUESTS_FAILED metric");

    /// Requests currently pending
    pub static ref PENDING_REQUESTS: IntGauge = register_int_gauge!(
        "txn_buffer_pending_requests",
        "Number of requests awaiting a reply"
    )
    .expect("Failed to create PENDING_REQUESTS metric");

    /// Latency of acknowledged requests
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "txn_buffer_request_latency_seconds",
        "Submit-to-reply latency of acknowledged requests"
    )
    .expect("Failed to create REQUEST_LATENCY metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_submitted(action: &str) {
    REQUESTS_SUBMITTED.with_label_values(&[action]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_succeeded(action: &str, latency_secs: f64) {
    REQUESTS_SUCCEEDED.with_label_values(&[action]).inc();
    REQUEST_LATENCY.observe(latency_secs);
}

#[cfg(feature = "metrics")]
pub fn record_failed(kind: &str) {
    REQUESTS_FAILED.with_label_values(&[kind]).inc();
}

#[cfg(feature = "metrics")]
pub fn set_pending_requests(count: usize) {
    PENDING_REQUESTS.set(count as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_submitted(_action: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_succeeded(_action: &str, _latency_secs: f64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_failed(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_pending_requests(_count: usize) {}
