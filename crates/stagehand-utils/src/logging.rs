/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Stagehand Logging Module
//!
//! Thin entry point over `tracing` for processes that do not export spans,
//! such as one-shot CLI commands and the CI runner.
//!
//! 1. Initialize the logger:
//!    ```rust,ignore
//!    stagehand_utils::logging::init("info", "text")?;
//!    ```
//!
//! 2. Use the log macros throughout your code:
//!    ```rust,ignore
//!    use stagehand_utils::logging::prelude::*;
//!    info!("This is an info message");
//!    ```
//!
//! Log levels: "off", "error", "warn", "info" (default), "debug", "trace".
//! Unknown levels fall back to "info". `RUST_LOG` wins over the configured level.

use crate::config::ResolvedTelemetry;
use crate::telemetry::{self, TelemetryError};
use tracing::level_filters::LevelFilter;

/// Normalizes a configured level into a filter, defaulting to INFO.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" => LevelFilter::WARN,
        "info" => LevelFilter::INFO,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// Initializes stderr logging with the given level and format ("text" or "json").
///
/// Calling this more than once returns an error from the second call; the
/// first subscriber stays installed.
pub fn init(level: &str, format: &str) -> Result<(), TelemetryError> {
    let disabled = ResolvedTelemetry {
        enabled: false,
        otlp_endpoint: String::new(),
        service_name: String::new(),
        sampling_rate: 0.0,
    };
    telemetry::init(&disabled, &level_filter(level).to_string(), format)
}

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{instrument, Instrument};
}
