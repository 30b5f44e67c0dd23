/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Background tasks for the Stagehand broker.

use crate::dal::DAL;
use crate::orchestrator;
use chrono::Duration as ChronoDuration;
use stagehand_utils::config::Broker;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

/// Configuration for the deployment timeout sweeper.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSweepConfig {
    /// How often to run the sweep (in seconds).
    pub interval_seconds: u64,
    /// Age after which a pending or approved deployment is failed (in minutes).
    pub timeout_minutes: i64,
}

impl Default for TimeoutSweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300, // 5 minutes
            timeout_minutes: 30,
        }
    }
}

impl TimeoutSweepConfig {
    pub fn from_settings(broker: &Broker) -> Self {
        Self {
            interval_seconds: broker.sweep_interval_seconds,
            timeout_minutes: broker.deployment_timeout_minutes,
        }
    }
}

/// Starts the deployment timeout sweeper.
///
/// Every tick fails deployments still `pending` or `approved` after
/// `timeout_minutes` and releases their target locks.
///
/// # Arguments
/// * `dal` - The Data Access Layer instance
/// * `config` - Configuration for the sweeper
pub fn start_timeout_sweep_task(dal: DAL, config: TimeoutSweepConfig) -> JoinHandle<()> {
    info!(
        "Starting deployment timeout sweeper (interval: {}s, timeout: {}m)",
        config.interval_seconds, config.timeout_minutes
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_seconds.max(1)));
        let timeout = ChronoDuration::minutes(config.timeout_minutes);

        loop {
            ticker.tick().await;

            match orchestrator::sweep_stale(&dal, timeout) {
                Ok(failed) => {
                    if !failed.is_empty() {
                        info!("Timed out {} stale deployments", failed.len());
                    }
                }
                Err(e) => {
                    error!("Failed to sweep stale deployments: {}", e);
                }
            }
        }
    })
}
