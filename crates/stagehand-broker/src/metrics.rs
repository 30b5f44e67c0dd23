/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metrics Module
//!
//! Prometheus metrics for the Stagehand broker, exposed on `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, IntCounter, Opts, Registry, TextEncoder};

/// Global Prometheus registry for all broker metrics
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// HTTP request counter
/// Labels: endpoint, method, status
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "stagehand_http_requests_total",
        "Total number of HTTP requests by endpoint and status",
    );
    let counter = CounterVec::new(opts, &["endpoint", "method", "status"])
        .expect("Failed to create HTTP requests counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register HTTP requests counter");
    counter
});

/// Repository dispatch attempts
/// Labels: stage, outcome (dispatched, missing_repo, locked, failed)
pub static DEPLOYMENT_DISPATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "stagehand_deployment_dispatches_total",
        "Total number of deployment dispatch attempts by stage and outcome",
    );
    let counter = CounterVec::new(opts, &["stage", "outcome"])
        .expect("Failed to create dispatch counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register dispatch counter");
    counter
});

/// Accepted status updates
/// Labels: status
pub static STATUS_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "stagehand_status_updates_total",
        "Total number of accepted deployment status updates by status",
    );
    let counter =
        CounterVec::new(opts, &["status"]).expect("Failed to create status update counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register status update counter");
    counter
});

/// Deployments failed by the timeout sweeper
pub static DEPLOYMENTS_TIMED_OUT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "stagehand_deployments_timed_out_total",
        "Total number of deployments failed by the timeout sweeper",
    )
    .expect("Failed to create timeout counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register timeout counter");
    counter
});

/// Records one HTTP request.
pub fn record_http_request(endpoint: &str, method: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[endpoint, method, &status.to_string()])
        .inc();
}

/// Records the outcome of a dispatch attempt.
pub fn record_dispatch(stage: &str, outcome: &str) {
    DEPLOYMENT_DISPATCHES_TOTAL
        .with_label_values(&[stage, outcome])
        .inc();
}

/// Records an accepted status update.
pub fn record_status_update(status: &str) {
    STATUS_UPDATES_TOTAL.with_label_values(&[status]).inc();
}

/// Records deployments failed by the sweeper.
pub fn record_timeouts(count: usize) {
    DEPLOYMENTS_TIMED_OUT_TOTAL.inc_by(count as u64);
}

/// Forces registration of every metric so `/metrics` lists them before first use.
pub fn init() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&DEPLOYMENT_DISPATCHES_TOTAL);
    Lazy::force(&STATUS_UPDATES_TOTAL);
    Lazy::force(&DEPLOYMENTS_TIMED_OUT_TOTAL);
}

/// Encodes all registered metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
