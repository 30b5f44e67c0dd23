/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{body_json, github_client, send, MockGitHub, TestFixture};
use axum::http::StatusCode;
use serde_json::json;
use stagehand_models::models::deployments::Stage;
use stagehand_models::models::projects::UpdateProject;

#[tokio::test]
async fn test_deploy_and_report_success() {
    let fixture = TestFixture::new();
    let github = MockGitHub::start(StatusCode::NO_CONTENT, "").await;
    let app = fixture.router(github.client());
    let project = fixture.insert_project(None);

    let response = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{}/deploy", project.id),
        Some(&fixture.admin_pak),
        Some(json!({"deployment_stage": "stage"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let dispatched = body_json(response).await;
    assert_eq!(dispatched["success"], true);
    assert_eq!(dispatched["target_repo"], "octo/portfolio-stage");
    let deployment_id: uuid::Uuid = dispatched["deployment_id"].as_str().unwrap().parse().unwrap();

    let calls = github.calls();
    assert_eq!(calls.len(), 1);
    let (repo, headers, payload) = &calls[0];
    assert_eq!(repo, "octo/portfolio");
    assert_eq!(headers["authorization"], "Bearer ghp_test");
    assert_eq!(payload["event_type"], "deploy-to-stage");
    assert_eq!(
        payload["client_payload"],
        json!({
            "deployment_id": deployment_id,
            "target_repo": "octo/portfolio-stage",
            "project_name": project.name,
        })
    );

    let deployment = fixture.dal.deployments().get(deployment_id).unwrap().unwrap();
    assert_eq!(deployment.status, "approved");
    assert!(deployment.approved_at.is_some());
    assert!(fixture
        .dal
        .deployment_locks()
        .get_for_target(project.id, Stage::Stage.as_str())
        .unwrap()
        .is_some());

    let response = send(
        &app,
        "GET",
        &format!("/api/v1/deployments/{}/context", deployment_id),
        Some(&fixture.runner_pak),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let context = body_json(response).await;
    assert_eq!(context["target_branch"], "main");
    assert_eq!(context["build_output_dir"], "dist");

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/status",
        Some(&fixture.runner_pak),
        Some(json!({
            "deployment_id": deployment_id,
            "status": "deployed",
            "deployment_url": "https://octo.github.io/portfolio-stage",
            "commit_hash": "abc123"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let deployment = fixture.dal.deployments().get(deployment_id).unwrap().unwrap();
    assert_eq!(deployment.status, "deployed");
    assert_eq!(deployment.commit_hash.as_deref(), Some("abc123"));
    assert!(deployment.deployed_at.is_some());
    assert!(fixture
        .dal
        .deployment_locks()
        .get_for_target(project.id, Stage::Stage.as_str())
        .unwrap()
        .is_none());

    let response = send(
        &app,
        "GET",
        &format!("/api/v1/changelog?deployment_id={}", deployment_id),
        Some(&fixture.admin_pak),
        None,
    )
    .await;
    let actions: Vec<String> = body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        actions,
        vec![
            "deployment.deployed".to_string(),
            "deployment.dispatched".to_string(),
            "deployment.created".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_second_deploy_to_locked_target_conflicts() {
    let fixture = TestFixture::new();
    let github = MockGitHub::start(StatusCode::NO_CONTENT, "").await;
    let app = fixture.router(github.client());
    let project = fixture.insert_project(Some("octo/octo.github.io"));
    let uri = format!("/api/v1/projects/{}/deploy", project.id);

    let first = send(&app, "POST", &uri, Some(&fixture.admin_pak), Some(json!({"deployment_stage": "stage"}))).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(&app, "POST", &uri, Some(&fixture.admin_pak), Some(json!({"deployment_stage": "stage"}))).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // The prod target is independent of stage.
    let prod = send(&app, "POST", &uri, Some(&fixture.admin_pak), Some(json!({"deployment_stage": "prod"}))).await;
    assert_eq!(prod.status(), StatusCode::OK);

    assert_eq!(github.calls().len(), 2);
}

#[tokio::test]
async fn test_missing_prod_repo_fails_without_dispatch() {
    let fixture = TestFixture::new();
    let github = MockGitHub::start(StatusCode::NO_CONTENT, "").await;
    let app = fixture.router(github.client());
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Prod);

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/dispatch",
        Some(&fixture.admin_pak),
        Some(json!({
            "deployment_id": deployment.id,
            "project_id": project.id,
            "deployment_stage": "prod"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(github.calls().is_empty());

    let deployment = fixture.dal.deployments().get(deployment.id).unwrap().unwrap();
    assert_eq!(deployment.status, "failed");
    assert!(deployment.approved_at.is_none());
    assert!(deployment.error_message.unwrap().contains("prod repository"));
}

#[tokio::test]
async fn test_rejected_dispatch_fails_deployment_and_frees_target() {
    let fixture = TestFixture::new();
    let github = MockGitHub::start(StatusCode::UNPROCESSABLE_ENTITY, "{\"message\":\"nope\"}").await;
    let app = fixture.router(github.client());
    let project = fixture.insert_project(None);

    let response = send(
        &app,
        "POST",
        &format!("/api/v1/projects/{}/deploy", project.id),
        Some(&fixture.admin_pak),
        Some(json!({"deployment_stage": "stage"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("422"));
    let deployment_id: uuid::Uuid = body["deployment_id"].as_str().unwrap().parse().unwrap();

    let deployment = fixture.dal.deployments().get(deployment_id).unwrap().unwrap();
    assert_eq!(deployment.status, "failed");
    assert!(fixture
        .dal
        .deployment_locks()
        .get_for_target(project.id, Stage::Stage.as_str())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_dispatch_with_mismatched_stage_is_rejected() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));
    let project = fixture.insert_project(Some("octo/octo.github.io"));
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/dispatch",
        Some(&fixture.admin_pak),
        Some(json!({
            "deployment_id": deployment.id,
            "project_id": project.id,
            "deployment_stage": "prod"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let deployment = fixture.dal.deployments().get(deployment.id).unwrap().unwrap();
    assert_eq!(deployment.status, "pending");
}

#[tokio::test]
async fn test_dispatch_of_deactivated_project_is_rejected() {
    let fixture = TestFixture::new();
    let github = MockGitHub::start(StatusCode::NO_CONTENT, "").await;
    let app = fixture.router(github.client());
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);
    fixture
        .dal
        .projects()
        .update(
            project.id,
            &UpdateProject {
                active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/dispatch",
        Some(&fixture.admin_pak),
        Some(json!({
            "deployment_id": deployment.id,
            "project_id": project.id,
            "deployment_stage": "stage"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(github.calls().is_empty());

    let deployment = fixture.dal.deployments().get(deployment.id).unwrap().unwrap();
    assert_eq!(deployment.status, "pending");
    assert!(deployment.approved_at.is_none());
}

#[tokio::test]
async fn test_status_report_validation_and_terminal_guard() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/status",
        Some(&fixture.runner_pak),
        Some(json!({"deployment_id": deployment.id, "status": "deployed"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/status",
        Some(&fixture.runner_pak),
        Some(json!({"deployment_id": deployment.id, "status": "failed", "error_message": "build broke"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/status",
        Some(&fixture.runner_pak),
        Some(json!({
            "deployment_id": deployment.id,
            "status": "deployed",
            "deployment_url": "https://example.com"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "POST",
        "/api/v1/deployments/status",
        Some(&fixture.runner_pak),
        Some(json!({
            "deployment_id": uuid::Uuid::new_v4(),
            "status": "failed",
            "error_message": "x"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_deployments_filters() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));
    let project = fixture.insert_project(Some("octo/octo.github.io"));
    fixture.insert_deployment(project.id, Stage::Stage);
    fixture.insert_deployment(project.id, Stage::Prod);

    let response = send(
        &app,
        "GET",
        &format!("/api/v1/deployments?project_id={}&stage=prod", project.id),
        Some(&fixture.admin_pak),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["deployment_stage"], "prod");

    let response = send(
        &app,
        "GET",
        "/api/v1/deployments?status=bogus",
        Some(&fixture.admin_pak),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
