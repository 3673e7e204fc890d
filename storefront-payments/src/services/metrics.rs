//! Prometheus metrics for storefront-payments.
//!
//! HTTP request metrics recorded by `service_core::middleware::metrics` go
//! through the `metrics` facade and are rendered by the exporter handle;
//! service metrics below live in the default `prometheus` registry. Both are
//! concatenated by [`get_metrics`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Webhook deliveries by provider, event type and outcome.
pub static WEBHOOK_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "storefront_webhook_events_total",
        "Total number of payment webhook deliveries",
        &["provider", "event", "outcome"]
    )
    .expect("Failed to register WEBHOOK_EVENTS")
});

/// Order payment confirmations by source (webhook/callback) and outcome.
pub static ORDER_CONFIRMATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "storefront_order_confirmations_total",
        "Total number of order payment confirmation attempts",
        &["source", "outcome"]
    )
    .expect("Failed to register ORDER_CONFIRMATIONS")
});

/// Checkout sessions started with a provider.
pub static CHECKOUT_SESSIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "storefront_checkout_sessions_total",
        "Total number of checkout initialisations",
        &["provider", "outcome"]
    )
    .expect("Failed to register CHECKOUT_SESSIONS")
});

pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "storefront_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Initialize all metrics and install the `metrics` recorder.
///
/// Safe to call more than once; only the first call installs the recorder.
pub fn init_metrics() {
    Lazy::force(&WEBHOOK_EVENTS);
    Lazy::force(&ORDER_CONFIRMATIONS);
    Lazy::force(&CHECKOUT_SESSIONS);
    Lazy::force(&DB_QUERY_DURATION);

    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder already installed"),
    }
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode prometheus metrics");
    }
    output.push_str(&String::from_utf8_lossy(&buffer));
    output
}

pub fn record_webhook_event(provider: &str, event: &str, outcome: &str) {
    WEBHOOK_EVENTS
        .with_label_values(&[provider, event, outcome])
        .inc();
}

pub fn record_order_confirmation(source: &str, outcome: &str) {
    ORDER_CONFIRMATIONS
        .with_label_values(&[source, outcome])
        .inc();
}

pub fn record_checkout_session(provider: &str, outcome: &str) {
    CHECKOUT_SESSIONS
        .with_label_values(&[provider, outcome])
        .inc();
}
