//! Prometheus metrics for the authorization service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

/// Client registrations counter.
pub static CLIENTS_REGISTERED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oauth_clients_registered_total",
        "Total number of client registrations",
        &["status"]
    )
    .expect("Failed to register clients_registered metric")
});

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oauth_tokens_issued_total",
        "Total number of token requests by outcome",
        &["status"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Token validations counter.
pub static TOKEN_VALIDATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oauth_token_validations_total",
        "Total number of token validations by result",
        &["result"]
    )
    .expect("Failed to register token_validations metric")
});

/// Expired tokens deleted by the sweep.
pub static TOKENS_RECLAIMED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "oauth_tokens_reclaimed_total",
        "Total number of expired tokens deleted by the sweep"
    )
    .expect("Failed to register tokens_reclaimed metric")
});

/// Sweep iterations counter.
pub static SWEEP_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "oauth_sweep_runs_total",
        "Total number of reclamation sweep runs",
        &["status"]
    )
    .expect("Failed to register sweep_runs metric")
});

/// Store call latency histogram.
pub static STORE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "oauth_store_operation_duration_seconds",
        "Store operation latency in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register store_latency metric")
});

/// Record a client registration.
pub fn record_client_registered(status: &str) {
    CLIENTS_REGISTERED.with_label_values(&[status]).inc();
}

/// Record a token request outcome.
pub fn record_token_issued(status: &str) {
    TOKENS_ISSUED.with_label_values(&[status]).inc();
}

/// Record a validation result ("valid" or a rejection kind).
pub fn record_token_validation(result: &str) {
    TOKEN_VALIDATIONS.with_label_values(&[result]).inc();
}

/// Record one sweep iteration.
pub fn record_sweep(status: &str, reclaimed: u64) {
    SWEEP_RUNS.with_label_values(&[status]).inc();
    if reclaimed > 0 {
        TOKENS_RECLAIMED.inc_by(reclaimed as f64);
    }
}

/// Record store call latency.
pub fn record_store_latency(operation: &str, duration_secs: f64) {
    STORE_LATENCY
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
