/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Deployment Orchestrator
//!
//! Coordinates a deployment from the broker side:
//!
//! 1. resolve the target repository for the requested [`Stage`],
//! 2. take the `(project, stage)` lock,
//! 3. move the deployment `pending -> approved`,
//! 4. send the repository-dispatch event to the project's source repository.
//!
//! A missing target repository fails the deployment without any outbound call.
//! A rejected dispatch fails the deployment and releases the lock; nothing is
//! retried. Status reports from the runner and the timeout sweeper go through
//! the same guarded transition table and release the lock once terminal.

use crate::dal::{LockAcquisition, DAL};
use crate::github::{ClientPayload, DispatchEvent, GitHubClient, GitHubError};
use crate::metrics;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use stagehand_models::models::changelog::{
    NewChangelogEntry, ACTION_DEPLOYMENT_DEPLOYED, ACTION_DEPLOYMENT_DISPATCHED,
    ACTION_DEPLOYMENT_FAILED, ACTION_DEPLOYMENT_TIMED_OUT, ACTOR_TYPE_SYSTEM,
};
use stagehand_models::models::deployment_locks::NewDeploymentLock;
use stagehand_models::models::deployments::{
    timeout_error_message, Deployment, DeploymentStatus, Stage, StatusChange,
};
use stagehand_models::models::projects::Project;
use stagehand_utils::config::Broker;
use stagehand_utils::logging::prelude::*;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Timing knobs for dispatch and sweeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Lifetime of a per-target lock.
    pub lock_ttl: Duration,
    /// Age after which an unfinished deployment is failed by the sweeper.
    pub deployment_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::minutes(45),
            deployment_timeout: Duration::minutes(30),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(broker: &Broker) -> Self {
        Self {
            lock_ttl: Duration::minutes(broker.lock_ttl_minutes),
            deployment_timeout: Duration::minutes(broker.deployment_timeout_minutes),
        }
    }
}

/// Request to dispatch an existing pending deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DispatchRequest {
    pub deployment_id: Uuid,
    pub project_id: Uuid,
    pub deployment_stage: Stage,
}

/// Successful dispatch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    pub success: bool,
    pub message: String,
    pub target_repo: String,
    pub deployment_id: Uuid,
}

/// Everything needed to send one dispatch, resolved from a project and stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    /// Repository that receives the event.
    pub source_repo: String,
    /// Repository the runner will publish to.
    pub target_repo: String,
    pub event: DispatchEvent,
}

/// Errors surfaced by orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    ProjectNotFound(Uuid),
    DeploymentNotFound(Uuid),
    ProjectInactive(String),
    /// The deployment belongs to another project or stage than requested.
    DeploymentMismatch(Uuid),
    InvalidTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
    MissingRepositoryConfig {
        project: String,
        stage: Stage,
    },
    DeploymentInProgress {
        stage: Stage,
        holder: Uuid,
    },
    DispatchFailed {
        status: Option<u16>,
        body: String,
    },
    Database(String),
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationError::ProjectNotFound(id) => write!(f, "Project {} not found", id),
            OrchestrationError::DeploymentNotFound(id) => {
                write!(f, "Deployment {} not found", id)
            }
            OrchestrationError::ProjectInactive(name) => {
                write!(f, "Project {} is not active", name)
            }
            OrchestrationError::DeploymentMismatch(id) => write!(
                f,
                "Deployment {} does not belong to the requested project and stage",
                id
            ),
            OrchestrationError::InvalidTransition { from, to } => {
                write!(f, "Cannot transition deployment from {} to {}", from, to)
            }
            OrchestrationError::MissingRepositoryConfig { project, stage } => write!(
                f,
                "No {} repository configured for project {}",
                stage, project
            ),
            OrchestrationError::DeploymentInProgress { stage, holder } => write!(
                f,
                "Deployment {} is already in progress for {}",
                holder, stage
            ),
            OrchestrationError::DispatchFailed {
                status: Some(status),
                body,
            } => write!(f, "Repository dispatch failed with status {}: {}", status, body),
            OrchestrationError::DispatchFailed { status: None, body } => {
                write!(f, "Repository dispatch failed: {}", body)
            }
            OrchestrationError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for OrchestrationError {}

impl From<diesel::result::Error> for OrchestrationError {
    fn from(e: diesel::result::Error) -> Self {
        OrchestrationError::Database(e.to_string())
    }
}

impl From<GitHubError> for OrchestrationError {
    fn from(e: GitHubError) -> Self {
        match e {
            GitHubError::Status { status, body } => OrchestrationError::DispatchFailed {
                status: Some(status),
                body,
            },
            GitHubError::Request(msg) => OrchestrationError::DispatchFailed {
                status: None,
                body: msg,
            },
        }
    }
}

/// Resolves the target repository and builds the dispatch event.
///
/// Fails with [`OrchestrationError::MissingRepositoryConfig`] when the stage has
/// no repository configured.
pub fn plan_dispatch(
    project: &Project,
    deployment_id: Uuid,
    stage: Stage,
) -> Result<DispatchPlan, OrchestrationError> {
    let target = project.target_for(stage);
    let target_repo = target
        .repo
        .ok_or_else(|| OrchestrationError::MissingRepositoryConfig {
            project: project.name.clone(),
            stage,
        })?;

    Ok(DispatchPlan {
        source_repo: project.source_repo.trim().to_string(),
        target_repo: target_repo.to_string(),
        event: DispatchEvent {
            event_type: stage.event_type().to_string(),
            client_payload: ClientPayload {
                deployment_id,
                target_repo: target_repo.to_string(),
                project_name: project.name.clone(),
            },
        },
    })
}

fn append_changelog(dal: &DAL, entry: Result<NewChangelogEntry, String>) {
    match entry {
        Ok(entry) => {
            if let Err(e) = dal.changelog().create(&entry) {
                error!("Failed to write changelog entry '{}': {:?}", entry.action, e);
            }
        }
        Err(e) => error!("Invalid changelog entry: {}", e),
    }
}

fn parse_status(deployment: &Deployment) -> Result<DeploymentStatus, OrchestrationError> {
    deployment
        .current_status()
        .map_err(OrchestrationError::Database)
}

/// Forces a deployment to `failed`, releases its lock and records why.
fn fail_deployment(
    dal: &DAL,
    deployment: &Deployment,
    stage: Stage,
    message: &str,
    actor_type: &str,
) -> Result<Deployment, OrchestrationError> {
    let failed = dal
        .deployments()
        .apply_change(deployment.id, &StatusChange::failed(message))
        .map_err(|e| match e {
            diesel::result::Error::NotFound => OrchestrationError::InvalidTransition {
                from: deployment
                    .current_status()
                    .unwrap_or(DeploymentStatus::Pending),
                to: DeploymentStatus::Failed,
            },
            other => other.into(),
        })?;

    dal.deployment_locks().release(deployment.id)?;
    metrics::record_status_update(DeploymentStatus::Failed.as_str());
    append_changelog(
        dal,
        NewChangelogEntry::new(ACTION_DEPLOYMENT_FAILED, actor_type, message).map(|e| {
            e.for_project(deployment.project_id)
                .for_deployment(deployment.id, stage)
        }),
    );

    Ok(failed)
}

/// Approves a pending deployment and sends the repository-dispatch event.
///
/// # Arguments
///
/// * `dal` - Data access layer.
/// * `github` - Client used for the outbound dispatch.
/// * `config` - Lock lifetime.
/// * `request` - Deployment, project and stage to dispatch.
/// * `actor_type` - Who asked, recorded in the changelog.
pub async fn dispatch_deployment(
    dal: &DAL,
    github: &GitHubClient,
    config: &OrchestratorConfig,
    request: &DispatchRequest,
    actor_type: &str,
) -> Result<DispatchResponse, OrchestrationError> {
    let stage = request.deployment_stage;
    info!(
        "Dispatching deployment {} of project {} to {}",
        request.deployment_id, request.project_id, stage
    );

    let project = dal
        .projects()
        .get(request.project_id)?
        .ok_or(OrchestrationError::ProjectNotFound(request.project_id))?;
    let deployment = dal
        .deployments()
        .get(request.deployment_id)?
        .ok_or(OrchestrationError::DeploymentNotFound(request.deployment_id))?;

    if deployment.project_id != project.id || deployment.stage().ok() != Some(stage) {
        warn!(
            "Deployment {} does not match project {} / {}",
            deployment.id, project.id, stage
        );
        return Err(OrchestrationError::DeploymentMismatch(deployment.id));
    }

    if !project.active {
        warn!("Refusing to dispatch inactive project {}", project.name);
        return Err(OrchestrationError::ProjectInactive(project.name));
    }

    let current = parse_status(&deployment)?;
    if !current.can_transition_to(DeploymentStatus::Approved) {
        return Err(OrchestrationError::InvalidTransition {
            from: current,
            to: DeploymentStatus::Approved,
        });
    }

    let plan = match plan_dispatch(&project, deployment.id, stage) {
        Ok(plan) => plan,
        Err(err) => {
            error!("Deployment {} cannot be dispatched: {}", deployment.id, err);
            metrics::record_dispatch(stage.as_str(), "missing_repo");
            fail_deployment(dal, &deployment, stage, &err.to_string(), actor_type)?;
            return Err(err);
        }
    };

    let new_lock = NewDeploymentLock::new(
        project.id,
        stage,
        deployment.id,
        Utc::now(),
        config.lock_ttl,
    )
    .map_err(OrchestrationError::Database)?;

    match dal.deployment_locks().acquire(&new_lock)? {
        LockAcquisition::Acquired(_) => {}
        LockAcquisition::Held(lock) => {
            warn!(
                "Target {} / {} is locked by deployment {}",
                project.name, stage, lock.deployment_id
            );
            metrics::record_dispatch(stage.as_str(), "locked");
            return Err(OrchestrationError::DeploymentInProgress {
                stage,
                holder: lock.deployment_id,
            });
        }
    }

    if let Err(e) = dal.deployments().approve(deployment.id) {
        dal.deployment_locks().release(deployment.id)?;
        return Err(match e {
            diesel::result::Error::NotFound => {
                let latest = dal
                    .deployments()
                    .get(deployment.id)?
                    .and_then(|d| d.current_status().ok())
                    .unwrap_or(current);
                OrchestrationError::InvalidTransition {
                    from: latest,
                    to: DeploymentStatus::Approved,
                }
            }
            other => other.into(),
        });
    }

    if let Err(e) = github
        .repository_dispatch(&plan.source_repo, &plan.event)
        .await
    {
        let err = OrchestrationError::from(e);
        error!("Dispatch for deployment {} failed: {}", deployment.id, err);
        metrics::record_dispatch(stage.as_str(), "failed");
        fail_deployment(dal, &deployment, stage, &err.to_string(), actor_type)?;
        return Err(err);
    }

    let message = format!(
        "Dispatched {} for {} to {}",
        plan.event.event_type, project.name, plan.target_repo
    );
    info!("{}", message);
    metrics::record_dispatch(stage.as_str(), "dispatched");
    append_changelog(
        dal,
        NewChangelogEntry::new(ACTION_DEPLOYMENT_DISPATCHED, actor_type, message.clone()).map(
            |e| {
                e.for_project(project.id)
                    .for_deployment(deployment.id, stage)
                    .with_details(serde_json::json!({
                        "event_type": plan.event.event_type,
                        "source_repo": plan.source_repo,
                        "target_repo": plan.target_repo,
                    }))
            },
        ),
    );

    Ok(DispatchResponse {
        success: true,
        message,
        target_repo: plan.target_repo,
        deployment_id: deployment.id,
    })
}

/// Records a terminal status reported by the runner or an admin.
///
/// Illegal transitions, including any write to a deployment that is already
/// terminal, fail with [`OrchestrationError::InvalidTransition`].
pub fn apply_status_update(
    dal: &DAL,
    deployment_id: Uuid,
    change: &StatusChange,
    actor_type: &str,
) -> Result<Deployment, OrchestrationError> {
    let deployment = dal
        .deployments()
        .get(deployment_id)?
        .ok_or(OrchestrationError::DeploymentNotFound(deployment_id))?;

    let current = parse_status(&deployment)?;
    if !current.can_transition_to(change.status) {
        warn!(
            "Rejected status update for deployment {}: {} -> {}",
            deployment_id, current, change.status
        );
        return Err(OrchestrationError::InvalidTransition {
            from: current,
            to: change.status,
        });
    }

    let updated = match dal.deployments().apply_change(deployment_id, change) {
        Ok(updated) => updated,
        Err(diesel::result::Error::NotFound) => {
            // Lost a race with another writer.
            let latest = dal
                .deployments()
                .get(deployment_id)?
                .and_then(|d| d.current_status().ok())
                .unwrap_or(current);
            return Err(OrchestrationError::InvalidTransition {
                from: latest,
                to: change.status,
            });
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Deployment {} moved from {} to {}",
        deployment_id, current, change.status
    );
    metrics::record_status_update(change.status.as_str());

    if change.status.is_terminal() {
        dal.deployment_locks().release(deployment_id)?;

        let (action, message) = match change.status {
            DeploymentStatus::Deployed => (
                ACTION_DEPLOYMENT_DEPLOYED,
                format!(
                    "Deployment {} published to {}",
                    deployment_id,
                    change.deployment_url.as_deref().unwrap_or("unknown url")
                ),
            ),
            _ => (
                ACTION_DEPLOYMENT_FAILED,
                format!(
                    "Deployment {} failed: {}",
                    deployment_id,
                    change.error_message.as_deref().unwrap_or("unknown error")
                ),
            ),
        };

        let entry = NewChangelogEntry::new(action, actor_type, message).map(|e| {
            let e = e.for_project(updated.project_id).with_details(serde_json::json!({
                "commit_hash": change.commit_hash,
                "deployment_url": change.deployment_url,
                "error_message": change.error_message,
            }));
            match updated.stage() {
                Ok(stage) => e.for_deployment(updated.id, stage),
                Err(_) => e,
            }
        });
        append_changelog(dal, entry);
    }

    Ok(updated)
}

/// Fails every deployment still `pending` or `approved` after `timeout`.
///
/// # Returns
///
/// Returns the deployments that were failed; terminal deployments are never touched.
pub fn sweep_stale(dal: &DAL, timeout: Duration) -> Result<Vec<Deployment>, OrchestrationError> {
    let cutoff = Utc::now() - timeout;
    let message = timeout_error_message(timeout.num_minutes());
    let failed = dal.deployments().fail_stale(cutoff, &message)?;

    if failed.is_empty() {
        return Ok(failed);
    }

    metrics::record_timeouts(failed.len());
    for deployment in &failed {
        warn!(
            "Deployment {} timed out (created at {})",
            deployment.id, deployment.created_at
        );
        let entry = NewChangelogEntry::new(
            ACTION_DEPLOYMENT_TIMED_OUT,
            ACTOR_TYPE_SYSTEM,
            message.as_str(),
        )
        .map(|e| {
            let e = e.for_project(deployment.project_id);
            match deployment.stage() {
                Ok(stage) => e.for_deployment(deployment.id, stage),
                Err(_) => e,
            }
        });
        append_changelog(dal, entry);
    }

    Ok(failed)
}
