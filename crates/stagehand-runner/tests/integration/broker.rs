/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{context, MockBroker, SERVICE_KEY};
use axum::http::StatusCode;
use reqwest::Client;
use stagehand_broker::api::v1::deployments::StatusUpdateRequest;
use stagehand_models::models::deployments::DeploymentStatus;
use stagehand_runner::broker::{self, BrokerEndpoint};
use stagehand_runner::RunnerError;
use uuid::Uuid;

fn failed_update(deployment_id: Uuid) -> StatusUpdateRequest {
    StatusUpdateRequest {
        deployment_id,
        status: DeploymentStatus::Failed,
        deployment_url: None,
        commit_hash: None,
        error_message: Some("npm run build exited with 1".to_string()),
        notes: None,
    }
}

#[test]
fn test_endpoint_requires_service_key() {
    let err = BrokerEndpoint::new("http://localhost:3000", "").unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));

    let endpoint = BrokerEndpoint::new("http://localhost:3000/", SERVICE_KEY).unwrap();
    assert_eq!(endpoint.base_url, "http://localhost:3000");
}

#[tokio::test]
async fn test_fetch_context_sends_service_key() {
    let id = Uuid::new_v4();
    let expected = context(id, "octo/portfolio-stage");
    let mock = MockBroker::start(Some(expected.clone()), StatusCode::OK).await;
    let endpoint = BrokerEndpoint::new(&mock.url, SERVICE_KEY).unwrap();

    let fetched = broker::fetch_deployment_context(&endpoint, &Client::new(), id)
        .await
        .unwrap();

    assert_eq!(fetched, expected);
    let requests = mock.context_requests();
    assert_eq!(
        requests[0]["authorization"],
        format!("Bearer {}", SERVICE_KEY).as_str()
    );
}

#[tokio::test]
async fn test_fetch_context_for_unknown_deployment() {
    let mock = MockBroker::start(None, StatusCode::OK).await;
    let endpoint = BrokerEndpoint::new(&mock.url, SERVICE_KEY).unwrap();

    let err = broker::fetch_deployment_context(&endpoint, &Client::new(), Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Broker { status: Some(404), .. }));
}

#[tokio::test]
async fn test_report_status_posts_update() {
    let mock = MockBroker::start(None, StatusCode::OK).await;
    let endpoint = BrokerEndpoint::new(&mock.url, SERVICE_KEY).unwrap();
    let id = Uuid::new_v4();

    let response = broker::report_status(&endpoint, &Client::new(), &failed_update(id))
        .await
        .unwrap();
    assert!(response.success);

    let reports = mock.reports();
    assert_eq!(reports.len(), 1);
    let (headers, body) = &reports[0];
    assert_eq!(headers["authorization"], format!("Bearer {}", SERVICE_KEY).as_str());
    assert_eq!(body["deployment_id"], id.to_string());
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error_message"], "npm run build exited with 1");
}

#[tokio::test]
async fn test_rejected_report_is_an_error() {
    let mock = MockBroker::start(None, StatusCode::CONFLICT).await;
    let endpoint = BrokerEndpoint::new(&mock.url, SERVICE_KEY).unwrap();

    let err = broker::report_status(&endpoint, &Client::new(), &failed_update(Uuid::new_v4()))
        .await
        .unwrap_err();

    match err {
        RunnerError::Broker { status, body } => {
            assert_eq!(status, Some(409));
            assert!(body.contains("Cannot transition"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_unreachable_broker() {
    let endpoint = BrokerEndpoint::new("http://127.0.0.1:1", SERVICE_KEY).unwrap();
    let err = broker::report_status(&endpoint, &Client::new(), &failed_update(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Broker { status: None, .. }));
}
