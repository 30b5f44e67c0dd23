/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Outbound GitHub REST client. The broker uses it to send repository-dispatch
//! events and the runner uses it to create target repositories that do not
//! exist yet.

use serde::{Deserialize, Serialize};
use stagehand_utils::config::GitHub;
use stagehand_utils::logging::prelude::*;
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

/// Payload carried inside `client_payload`. Kept to exactly these three fields;
/// everything else the runner needs comes from the deployment context endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClientPayload {
    pub deployment_id: Uuid,
    pub target_repo: String,
    pub project_name: String,
}

/// Body of `POST /repos/{owner}/{repo}/dispatches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub event_type: String,
    pub client_payload: ClientPayload,
}

/// Body of `POST /user/repos` and `POST /orgs/{org}/repos`.
#[derive(Debug, Clone, Serialize)]
struct CreateRepository<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(rename = "type")]
    kind: String,
}

/// Errors returned by [`GitHubClient`].
#[derive(Debug)]
pub enum GitHubError {
    /// The client could not be built or the request never got a response.
    Request(String),
    /// GitHub answered with a non-2xx status.
    Status { status: u16, body: String },
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitHubError::Request(msg) => write!(f, "GitHub request failed: {}", msg),
            GitHubError::Status { status, body } => {
                write!(f, "GitHub API returned {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for GitHubError {}

/// Thin wrapper over `reqwest` that knows GitHub's headers.
#[derive(Clone, Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    api_version: String,
}

impl GitHubClient {
    pub fn new(config: &GitHub) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GitHubError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(GitHubClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", &self.api_version)
    }

    /// Base URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Sends a repository-dispatch event to `repo` (`owner/name`).
    ///
    /// GitHub answers 204 on success. Any non-2xx status is returned as
    /// [`GitHubError::Status`] with the response body; nothing is retried.
    pub async fn repository_dispatch(
        &self,
        repo: &str,
        event: &DispatchEvent,
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/dispatches", self.api_url, repo);
        info!(
            "Sending {} dispatch to {} for deployment {}",
            event.event_type, repo, event.client_payload.deployment_id
        );

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(event)
            .send()
            .await
            .map_err(|e| {
                error!("Repository dispatch to {} failed: {}", repo, e);
                GitHubError::Request(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            debug!("Repository dispatch to {} accepted with {}", repo, status);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Repository dispatch to {} rejected with {}: {}",
                repo, status, body
            );
            Err(GitHubError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
    /// Returns true when `owner` is an organization account.
    async fn is_organization(&self, owner: &str) -> Result<bool, GitHubError> {
        let url = format!("{}/users/{}", self.api_url, owner);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let account: Account = response
            .json()
            .await
            .map_err(|e| GitHubError::Request(format!("Invalid account response: {}", e)))?;
        Ok(account.kind == "Organization")
    }

    /// Creates the public repository `repo` (`owner/name`).
    ///
    /// Organization owners go through `/orgs/{owner}/repos`; anything else is
    /// created under the authenticated user.
    pub async fn create_repository(&self, repo: &str) -> Result<(), GitHubError> {
        let (owner, name) = repo
            .split_once('/')
            .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
            .ok_or_else(|| GitHubError::Request(format!("Invalid repository name: {}", repo)))?;

        let url = if self.is_organization(owner).await? {
            format!("{}/orgs/{}/repos", self.api_url, owner)
        } else {
            format!("{}/user/repos", self.api_url)
        };
        info!("Creating repository {}", repo);

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&CreateRepository {
                name,
                private: false,
                auto_init: false,
            })
            .send()
            .await
            .map_err(|e| {
                error!("Creating repository {} failed: {}", repo, e);
                GitHubError::Request(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!("Creating repository {} rejected with {}: {}", repo, status, body);
            Err(GitHubError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
