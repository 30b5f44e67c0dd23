/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{
    branch_head, context, init_bare, write_files, GitHost, MockBroker, MockGitHub, SERVICE_KEY,
};
use axum::http::StatusCode;
use stagehand_runner::broker::BrokerEndpoint;
use stagehand_runner::cli::commands;
use stagehand_runner::cli::DeployArgs;
use stagehand_utils::config::Settings;
use tempfile::TempDir;
use uuid::Uuid;

const TARGET: &str = "octo/portfolio-stage";

fn settings(host: &GitHost, github: &MockGitHub) -> Settings {
    let mut settings = Settings::new(None).expect("Failed to load default settings");
    settings.runner.git_base_url = host.base_url();
    settings.github.api_url = github.url.clone();
    settings.github.request_timeout_seconds = 5;
    settings
}

fn deploy_args(deployment_id: Uuid, workspace: &TempDir, host: &GitHost) -> DeployArgs {
    DeployArgs {
        deployment_id,
        target_repo: TARGET.to_string(),
        project_name: "portfolio".to_string(),
        workspace: workspace.path().to_path_buf(),
        build_dir: None,
        github_token: None,
        worktree: Some(host.root.path().join(format!("work-{}", deployment_id))),
    }
}

#[tokio::test]
async fn test_deploy_reports_commit_and_url() {
    let host = GitHost::new();
    let remote = init_bare(host.root.path(), TARGET);
    let github = MockGitHub::start(host.root.path()).await;
    let id = Uuid::new_v4();
    let broker = MockBroker::start(Some(context(id, TARGET)), StatusCode::OK).await;
    let endpoint = BrokerEndpoint::new(&broker.url, SERVICE_KEY).unwrap();
    let workspace = TempDir::new().unwrap();
    write_files(workspace.path(), &[("dist/index.html", "<h1>stage</h1>")]);

    commands::deploy(&settings(&host, &github), &endpoint, deploy_args(id, &workspace, &host))
        .await
        .expect("deploy should succeed");

    let reports = broker.reports();
    assert_eq!(reports.len(), 1);
    let body = &reports[0].1;
    assert_eq!(body["deployment_id"], id.to_string());
    assert_eq!(body["status"], "deployed");
    assert_eq!(body["commit_hash"], branch_head(&remote, "main"));
    assert_eq!(body["deployment_url"], "https://octo.github.io/portfolio-stage");
}

#[tokio::test]
async fn test_deploy_without_context_uses_defaults() {
    let host = GitHost::new();
    let remote = init_bare(host.root.path(), TARGET);
    let github = MockGitHub::start(host.root.path()).await;
    let broker = MockBroker::start(None, StatusCode::OK).await;
    let endpoint = BrokerEndpoint::new(&broker.url, SERVICE_KEY).unwrap();
    let workspace = TempDir::new().unwrap();
    write_files(workspace.path(), &[("dist/index.html", "hi")]);

    commands::deploy(
        &settings(&host, &github),
        &endpoint,
        deploy_args(Uuid::new_v4(), &workspace, &host),
    )
    .await
    .expect("deploy should succeed");

    let body = &broker.reports()[0].1;
    assert_eq!(body["status"], "deployed");
    assert_eq!(body["commit_hash"], branch_head(&remote, "main"));
    assert_eq!(body["deployment_url"], "https://octo.github.io/portfolio-stage");
}

#[tokio::test]
async fn test_missing_build_reports_failure_and_errors() {
    let host = GitHost::new();
    init_bare(host.root.path(), TARGET);
    let github = MockGitHub::start(host.root.path()).await;
    let id = Uuid::new_v4();
    let broker = MockBroker::start(Some(context(id, TARGET)), StatusCode::OK).await;
    let endpoint = BrokerEndpoint::new(&broker.url, SERVICE_KEY).unwrap();
    let workspace = TempDir::new().unwrap();

    let result = commands::deploy(
        &settings(&host, &github),
        &endpoint,
        deploy_args(id, &workspace, &host),
    )
    .await;
    assert!(result.is_err());

    let body = &broker.reports()[0].1;
    assert_eq!(body["status"], "failed");
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("does not exist"));
    assert!(body["commit_hash"].is_null());
}

#[tokio::test]
async fn test_rejected_report_fails_the_job() {
    let host = GitHost::new();
    init_bare(host.root.path(), TARGET);
    let github = MockGitHub::start(host.root.path()).await;
    let id = Uuid::new_v4();
    let broker = MockBroker::start(Some(context(id, TARGET)), StatusCode::CONFLICT).await;
    let endpoint = BrokerEndpoint::new(&broker.url, SERVICE_KEY).unwrap();
    let workspace = TempDir::new().unwrap();
    write_files(workspace.path(), &[("dist/index.html", "late")]);

    let result = commands::deploy(
        &settings(&host, &github),
        &endpoint,
        deploy_args(id, &workspace, &host),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(broker.reports()[0].1["status"], "deployed");
}
