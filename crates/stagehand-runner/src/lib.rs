/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Stagehand Runner
//!
//! Runs inside the source repository's CI job after a `deploy-to-stage` or
//! `deploy-to-prod` repository-dispatch event. It mirrors the freshly built
//! output into the target repository and reports the outcome to the broker.
//!
//! ## Operation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant CI
//!     participant Runner
//!     participant Broker
//!     participant Target as Target repo
//!
//!     CI->>Runner: deploy (client_payload env)
//!     Runner->>Broker: GET /deployments/{id}/context
//!     Runner->>Target: clone (or init + create)
//!     Runner->>Target: commit + push
//!     Runner->>Broker: POST /deployments/status
//! ```
//!
//! A ready-made GitHub Actions workflow that runs the runner lives in
//! `workflow/stagehand-deploy.yml` at the root of this crate.
//!
//! ## Configuration
//!
//! The runner reads the same layered configuration as the broker. The CI
//! environment overrides the pieces a workflow supplies directly:
//!
//! ```yaml
//! runner:
//!   broker_url: "https://stagehand.example.com"   # STAGEHAND_BROKER_URL
//!   service_key: "stagehand_..."                  # STAGEHAND_SERVICE_KEY
//!   git_base_url: "https://github.com"
//!   build_dir: "dist"                             # BUILD_DIR
//!   default_branch: "main"
//! github:
//!   token: "ghp_..."                              # GITHUB_TOKEN
//! ```

pub mod broker;
pub mod cli;
pub mod error;
pub mod git;
pub mod mirror;

pub use error::RunnerError;
