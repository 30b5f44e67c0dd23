/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Stagehand Broker
//!
//! `stagehand-broker` is the control plane of Stagehand. It stores projects and
//! deployment records, turns an approval into a GitHub repository-dispatch event,
//! guarantees one in-flight deployment per project and stage, accepts status
//! reports from the CI runner and fails deployments that never report back.

pub mod api;
pub mod cli;
pub mod dal;
pub mod db;
pub mod github;
pub mod metrics;
pub mod orchestrator;
pub mod utils;
