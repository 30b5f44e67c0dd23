/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # CLI Commands Module
//!
//! ## deploy
//!
//! ```mermaid
//! flowchart TD
//!     A[Fetch deployment context] --> B[Plan mirror]
//!     B --> C[Mirror build into target]
//!     C -->|ok| D[Report deployed]
//!     C -->|err| E[Report failed]
//!     E --> F[Exit non-zero]
//! ```
//!
//! The context fetch is best effort: without it the runner falls back to the
//! configured branch and the GitHub Pages address of the target repository.
//!
//! ## report
//!
//! Posts a single status update, used by a workflow's failure step when the
//! build itself broke before `deploy` ran.

use crate::broker::{self, BrokerEndpoint};
use crate::cli::{DeployArgs, ReportArgs};
use crate::error::RunnerError;
use crate::git;
use crate::mirror::{self, MirrorRequest};
use reqwest::Client;
use stagehand_broker::api::v1::deployments::{DeploymentContext, StatusUpdateRequest};
use stagehand_broker::github::GitHubClient;
use stagehand_models::models::deployments::DeploymentStatus;
use stagehand_utils::config::{GitHub, Settings};
use stagehand_utils::logging::prelude::*;
use std::time::Duration;

/// Resolved inputs for one deploy run.
#[derive(Debug, Clone)]
pub struct MirrorPlan {
    pub request: MirrorRequest,
    pub deployment_url: String,
    pub github: GitHub,
}

/// Combines CLI arguments, the broker's deployment context and configuration.
///
/// Explicit arguments win over the context, which wins over configuration.
pub fn plan_mirror(
    config: &Settings,
    args: &DeployArgs,
    context: Option<&DeploymentContext>,
) -> Result<MirrorPlan, RunnerError> {
    let target_repo = args.target_repo.trim();
    if target_repo.is_empty() {
        return Err(RunnerError::Config(
            "no target repository was provided".to_string(),
        ));
    }

    let mut github = config.github.clone();
    if let Some(token) = args.github_token.as_ref().filter(|t| !t.is_empty()) {
        github.token = token.clone();
    }

    let build_dir = args
        .build_dir
        .clone()
        .or_else(|| context.map(|c| c.build_output_dir.clone()))
        .unwrap_or_else(|| config.runner.build_dir.clone());

    let branch = context
        .map(|c| c.target_branch.clone())
        .unwrap_or_else(|| config.runner.default_branch.clone());

    let deployment_url = context
        .and_then(|c| c.deployment_url.clone())
        .or_else(|| mirror::pages_url(target_repo))
        .ok_or_else(|| {
            RunnerError::Config(format!("cannot derive a deployment url for {}", target_repo))
        })?;

    let worktree = args.worktree.clone().unwrap_or_else(|| {
        std::env::temp_dir().join(format!("stagehand-{}", args.deployment_id))
    });

    let remote = git::remote_url(&config.runner.git_base_url, target_repo, &github.token)?;
    let secret = Some(github.token.clone()).filter(|t| !t.is_empty());

    Ok(MirrorPlan {
        request: MirrorRequest {
            target_repo: target_repo.to_string(),
            project_name: args.project_name.clone(),
            branch,
            remote,
            secret,
            build_dir: args.workspace.join(build_dir),
            worktree,
            author_name: config.runner.author_name.clone(),
            author_email: config.runner.author_email.clone(),
        },
        deployment_url,
        github,
    })
}

fn http_client(config: &Settings) -> Result<Client, RunnerError> {
    Client::builder()
        .timeout(Duration::from_secs(config.github.request_timeout_seconds))
        .build()
        .map_err(RunnerError::from)
}

async fn run_mirror(
    config: &Settings,
    args: &DeployArgs,
    context: Option<&DeploymentContext>,
) -> Result<(String, String), RunnerError> {
    let plan = plan_mirror(config, args, context)?;
    let github = GitHubClient::new(&plan.github)?;
    let outcome = mirror::mirror(&plan.request, &github).await?;
    if !outcome.cloned {
        info!("Created target repository {}", plan.request.target_repo);
    }
    Ok((outcome.commit_hash, plan.deployment_url))
}

/// Mirrors the build and reports the outcome. Returns an error when either
/// the mirror or the report failed.
pub async fn deploy(
    config: &Settings,
    endpoint: &BrokerEndpoint,
    args: DeployArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Deploying {} to {} for deployment {}",
        args.project_name, args.target_repo, args.deployment_id
    );
    let client = http_client(config)?;

    let context = match broker::fetch_deployment_context(endpoint, &client, args.deployment_id)
        .await
    {
        Ok(context) => Some(context),
        Err(e) => {
            warn!("Continuing without deployment context: {}", e);
            None
        }
    };

    let result = run_mirror(config, &args, context.as_ref()).await;
    let update = match &result {
        Ok((commit_hash, deployment_url)) => StatusUpdateRequest {
            deployment_id: args.deployment_id,
            status: DeploymentStatus::Deployed,
            deployment_url: Some(deployment_url.clone()),
            commit_hash: Some(commit_hash.clone()),
            error_message: None,
            notes: None,
        },
        Err(e) => {
            error!("Deployment {} failed: {}", args.deployment_id, e);
            StatusUpdateRequest {
                deployment_id: args.deployment_id,
                status: DeploymentStatus::Failed,
                deployment_url: None,
                commit_hash: None,
                error_message: Some(e.to_string()),
                notes: None,
            }
        }
    };

    broker::report_status(endpoint, &client, &update).await?;

    let (commit_hash, deployment_url) = result?;
    println!("Deployed {} at {}", commit_hash, deployment_url);
    Ok(())
}

/// Sends a single status report.
pub async fn report(
    config: &Settings,
    endpoint: &BrokerEndpoint,
    args: ReportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = http_client(config)?;
    let update = StatusUpdateRequest {
        deployment_id: args.deployment_id,
        status: args.status,
        deployment_url: args.deployment_url,
        commit_hash: args.commit_hash,
        error_message: args.error_message,
        notes: args.notes,
    };

    let response = broker::report_status(endpoint, &client, &update).await?;
    println!("{}", response.message);
    Ok(())
}
