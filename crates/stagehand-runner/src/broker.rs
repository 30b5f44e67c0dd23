/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Broker Communication Module
//!
//! Calls the Stagehand broker on behalf of a CI job, authenticated with the
//! runner's service key.
//!
//! - `fetch_deployment_context` reads `GET /api/v1/deployments/{id}/context`
//! - `report_status` posts to `POST /api/v1/deployments/status`
//!
//! Neither call is retried. A failed report leaves the deployment `approved`
//! until the broker's timeout sweeper fails it.

use crate::error::RunnerError;
use reqwest::Client;
use stagehand_broker::api::v1::deployments::{
    DeploymentContext, StatusUpdateRequest, StatusUpdateResponse,
};
use stagehand_utils::logging::prelude::*;
use uuid::Uuid;

/// Connection details for the broker.
#[derive(Debug, Clone)]
pub struct BrokerEndpoint {
    pub base_url: String,
    pub service_key: String,
}

impl BrokerEndpoint {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, RunnerError> {
        if service_key.is_empty() {
            return Err(RunnerError::Config(
                "a runner service key is required to talk to the broker".to_string(),
            ));
        }
        Ok(BrokerEndpoint {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

async fn error_from(response: reqwest::Response) -> RunnerError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RunnerError::Broker {
        status: Some(status),
        body,
    }
}

/// Fetches the metadata the dispatch payload leaves out.
pub async fn fetch_deployment_context(
    endpoint: &BrokerEndpoint,
    client: &Client,
    deployment_id: Uuid,
) -> Result<DeploymentContext, RunnerError> {
    let url = endpoint.url(&format!("/deployments/{}/context", deployment_id));
    debug!("Fetching deployment context from {}", url);

    let response = client
        .get(&url)
        .bearer_auth(&endpoint.service_key)
        .send()
        .await
        .map_err(|e| {
            error!("Failed to reach broker at {}: {}", url, e);
            RunnerError::from(e)
        })?;

    if response.status().is_success() {
        Ok(response.json::<DeploymentContext>().await?)
    } else {
        let err = error_from(response).await;
        error!("Fetching context for deployment {} failed: {}", deployment_id, err);
        Err(err)
    }
}

/// Reports a deployment outcome.
pub async fn report_status(
    endpoint: &BrokerEndpoint,
    client: &Client,
    update: &StatusUpdateRequest,
) -> Result<StatusUpdateResponse, RunnerError> {
    let url = endpoint.url("/deployments/status");
    info!(
        "Reporting status {} for deployment {}",
        update.status, update.deployment_id
    );

    let response = client
        .post(&url)
        .bearer_auth(&endpoint.service_key)
        .json(update)
        .send()
        .await
        .map_err(|e| {
            error!("Failed to reach broker at {}: {}", url, e);
            RunnerError::from(e)
        })?;

    match response.status() {
        status if status.is_success() => Ok(response.json::<StatusUpdateResponse>().await?),
        reqwest::StatusCode::CONFLICT => {
            let err = error_from(response).await;
            warn!(
                "Broker refused status {} for deployment {}: {}",
                update.status, update.deployment_id, err
            );
            Err(err)
        }
        _ => {
            let err = error_from(response).await;
            error!(
                "Status report for deployment {} failed: {}",
                update.deployment_id, err
            );
            Err(err)
        }
    }
}
