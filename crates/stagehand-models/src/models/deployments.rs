/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Deployments Module
//!
//! A deployment is one attempt to publish a project's build to a stage.
//!
//! ## Status Flow
//!
//! ```text
//! pending --> approved --> deployed
//!    |            |
//!    +--> failed <+
//! ```
//!
//! - `pending`: created, no external action taken yet
//! - `approved`: repository dispatch accepted upstream; CI owns the deployment
//! - `deployed`: terminal success, carries `deployed_at` and `deployment_url`
//! - `failed`: terminal failure, carries `error_message`
//!
//! Terminal states are final. Every write goes through [`DeploymentStatus::can_transition_to`],
//! and the DAL re-checks the current status in the `UPDATE ... WHERE status IN (...)` clause.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Deployment stage. `dev` is the source repository and never a dispatch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Stage,
    Prod,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Stage, Stage::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Stage => "stage",
            Stage::Prod => "prod",
        }
    }

    /// Repository-dispatch event type consumed by the CI workflow.
    pub fn event_type(&self) -> &'static str {
        match self {
            Stage::Stage => "deploy-to-stage",
            Stage::Prod => "deploy-to-prod",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage" => Ok(Stage::Stage),
            "prod" => Ok(Stage::Prod),
            other => Err(format!(
                "Invalid deployment stage '{}': expected 'stage' or 'prod'",
                other
            )),
        }
    }
}

/// Deployment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Approved,
    Deployed,
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Approved => "approved",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Deployed | DeploymentStatus::Failed)
    }

    /// Statuses a deployment may be in immediately before entering `self`.
    pub fn predecessors(&self) -> &'static [DeploymentStatus] {
        match self {
            DeploymentStatus::Pending => &[],
            DeploymentStatus::Approved => &[DeploymentStatus::Pending],
            DeploymentStatus::Deployed => &[DeploymentStatus::Approved],
            DeploymentStatus::Failed => &[DeploymentStatus::Pending, DeploymentStatus::Approved],
        }
    }

    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(DeploymentStatus::Pending),
            "approved" => Ok(DeploymentStatus::Approved),
            "deployed" => Ok(DeploymentStatus::Deployed),
            "failed" => Ok(DeploymentStatus::Failed),
            other => Err(format!("Invalid deployment status '{}'", other)),
        }
    }
}

/// Error message written by the timeout sweeper for a `timeout_minutes` timeout.
pub fn timeout_error_message(timeout_minutes: i64) -> String {
    format!("Deployment timed out after {} minutes", timeout_minutes)
}

/// Represents a deployment attempt.
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    AsChangeset,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    PartialEq,
    ToSchema,
)]
#[diesel(table_name = crate::schema::deployments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[schema(example = json!({
    "id": "123e4567-e89b-12d3-a456-426614174000",
    "created_at": "2025-01-01T00:00:00Z",
    "updated_at": "2025-01-01T00:02:00Z",
    "project_id": "123e4567-e89b-12d3-a456-426614174001",
    "deployment_stage": "stage",
    "status": "deployed",
    "approved_at": "2025-01-01T00:00:01Z",
    "deployed_at": "2025-01-01T00:02:00Z",
    "commit_hash": "abc123",
    "deployment_url": "https://stage.example.com",
    "error_message": null,
    "notes": null
}))]
pub struct Deployment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Project being deployed.
    pub project_id: Uuid,
    /// Target stage: "stage" or "prod".
    pub deployment_stage: String,
    /// One of pending, approved, deployed, failed.
    pub status: String,
    /// Set when the repository dispatch is about to be sent.
    pub approved_at: Option<DateTime<Utc>>,
    /// Set when the runner reports success.
    pub deployed_at: Option<DateTime<Utc>>,
    pub commit_hash: Option<String>,
    pub deployment_url: Option<String>,
    pub error_message: Option<String>,
    pub notes: Option<String>,
}

impl Deployment {
    pub fn stage(&self) -> Result<Stage, String> {
        self.deployment_stage.parse()
    }

    pub fn current_status(&self) -> Result<DeploymentStatus, String> {
        self.status.parse()
    }

    /// True when the deployment never reached a terminal state and was created
    /// more than `timeout` before `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match self.current_status() {
            Ok(status) if !status.is_terminal() => self.created_at < now - timeout,
            _ => false,
        }
    }
}

/// Represents a new deployment to be inserted. Always starts `pending`.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::schema::deployments)]
pub struct NewDeployment {
    pub project_id: Uuid,
    pub deployment_stage: String,
    pub status: String,
    pub notes: Option<String>,
}

impl NewDeployment {
    /// Creates a new pending deployment.
    ///
    /// # Returns
    ///
    /// Returns `Err` if the project id is nil.
    pub fn new(project_id: Uuid, stage: Stage, notes: Option<String>) -> Result<Self, String> {
        if project_id.is_nil() {
            return Err("Invalid project ID".to_string());
        }

        Ok(NewDeployment {
            project_id,
            deployment_stage: stage.as_str().to_string(),
            status: DeploymentStatus::Pending.as_str().to_string(),
            notes: notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// A validated status report from the runner, an admin, or the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: DeploymentStatus,
    pub deployment_url: Option<String>,
    pub commit_hash: Option<String>,
    pub error_message: Option<String>,
    pub notes: Option<String>,
}

impl StatusChange {
    /// Validates a reported terminal status.
    ///
    /// `deployed` requires a deployment URL and `failed` requires an error message.
    /// An error message sent with `deployed` is dropped, notes are kept.
    /// Only terminal statuses can be reported; `approved` is owned by dispatch.
    pub fn new(
        status: DeploymentStatus,
        deployment_url: Option<String>,
        commit_hash: Option<String>,
        error_message: Option<String>,
        notes: Option<String>,
    ) -> Result<Self, String> {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let deployment_url = non_empty(deployment_url);
        let commit_hash = non_empty(commit_hash);
        let error_message =
            non_empty(error_message).filter(|_| status != DeploymentStatus::Deployed);
        let notes = non_empty(notes);

        match status {
            DeploymentStatus::Deployed if deployment_url.is_none() => {
                return Err("A deployed status requires deployment_url".to_string());
            }
            DeploymentStatus::Failed if error_message.is_none() => {
                return Err("A failed status requires error_message".to_string());
            }
            DeploymentStatus::Pending | DeploymentStatus::Approved => {
                return Err(format!(
                    "Status '{}' cannot be reported; only 'deployed' or 'failed'",
                    status
                ));
            }
            _ => {}
        }

        if let Some(hash) = &commit_hash {
            if hash.len() > 64 {
                return Err("commit_hash cannot exceed 64 characters".to_string());
            }
        }

        Ok(StatusChange {
            status,
            deployment_url,
            commit_hash,
            error_message,
            notes,
        })
    }

    /// Failure with a fixed message, used by dispatch errors and the sweeper.
    pub fn failed(message: impl Into<String>) -> Self {
        StatusChange {
            status: DeploymentStatus::Failed,
            deployment_url: None,
            commit_hash: None,
            error_message: Some(message.into()),
            notes: None,
        }
    }
}
