/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Stagehand Telemetry Module
//!
//! OpenTelemetry-based tracing for the broker and the runner.
//!
//! ```rust,ignore
//! use stagehand_utils::telemetry;
//!
//! let settings = Settings::new(None)?;
//! telemetry::init(&settings.telemetry.for_broker(), &settings.log.level, &settings.log.format)?;
//! tracing::info!("Application started");
//! ```

use crate::config::ResolvedTelemetry;
use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Sampler;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Error type for telemetry initialization
#[derive(Debug)]
pub enum TelemetryError {
    /// Failed to create OTLP exporter
    ExporterError(String),
    /// Failed to set global subscriber
    SubscriberError(String),
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::ExporterError(e) => write!(f, "OTLP exporter error: {}", e),
            TelemetryError::SubscriberError(e) => write!(f, "Subscriber error: {}", e),
        }
    }
}

impl std::error::Error for TelemetryError {}

/// Maps a sampling rate onto an OpenTelemetry sampler.
pub(crate) fn sampler_for(rate: f64) -> Sampler {
    if rate >= 1.0 {
        Sampler::AlwaysOn
    } else if rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(rate)
    }
}

/// Builds the stderr formatting layer for the requested format.
pub(crate) fn fmt_layer(log_format: &str) -> Box<dyn Layer<Registry> + Send + Sync> {
    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    }
}

/// Initialize tracing with the given configuration.
///
/// When telemetry is disabled this installs only the formatting layer and
/// the level filter. Otherwise spans are also exported over OTLP.
///
/// # Arguments
/// * `config` - Resolved telemetry configuration (from `Telemetry::for_broker()` or `for_runner()`)
/// * `log_level` - Log level filter string (e.g., "info", "debug")
/// * `log_format` - Log format ("text" or "json")
pub fn init(
    config: &ResolvedTelemetry,
    log_level: &str,
    log_format: &str,
) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if !config.enabled {
        return tracing_subscriber::registry()
            .with(fmt_layer(log_format))
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberError(e.to_string()));
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterError(e.to_string()))?;

    let tracer_provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler_for(config.sampling_rate))
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    let tracer = tracer_provider.tracer(config.service_name.clone());
    opentelemetry::global::set_tracer_provider(tracer_provider);

    tracing_subscriber::registry()
        .with(fmt_layer(log_format))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(env_filter)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberError(e.to_string()))
}

/// Shutdown OpenTelemetry, flushing any pending spans.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}
