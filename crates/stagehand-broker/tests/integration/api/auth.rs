/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{body_json, github_client, offline_router, send, TestFixture};
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_missing_authorization_is_rejected() {
    let app = offline_router();

    let response = send(&app, "GET", "/api/v1/projects", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_admin_pak_endpoint() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));

    let response = send(&app, "POST", "/api/v1/auth/pak", Some(&fixture.admin_pak), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["admin"], true);
    assert_eq!(body["runner"], json!(null));
}

#[tokio::test]
async fn test_verify_runner_pak_records_activity() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));
    assert!(fixture.runner.last_active_at.is_none());

    let response = send(&app, "POST", "/api/v1/auth/pak", Some(&fixture.runner_pak), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["admin"], false);
    assert_eq!(body["runner"], fixture.runner.id.to_string());

    let runner = fixture.dal.runners().get(fixture.runner.id).unwrap().unwrap();
    assert!(runner.last_active_at.is_some());
}

#[tokio::test]
async fn test_inactive_runner_is_rejected() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));
    fixture
        .dal
        .runners()
        .set_active(fixture.runner.id, false)
        .unwrap();

    let response = send(&app, "POST", "/api/v1/auth/pak", Some(&fixture.runner_pak), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_runner_cannot_use_admin_routes() {
    let fixture = TestFixture::new();
    let app = fixture.router(github_client("http://127.0.0.1:1"));

    let response = send(&app, "GET", "/api/v1/projects", Some(&fixture.runner_pak), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, "GET", "/api/v1/changelog", Some(&fixture.runner_pak), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
