/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{body_json, offline_router, send};
use axum::body::to_bytes;
use axum::http::StatusCode;

#[tokio::test]
async fn test_healthz_endpoint() {
    let app = offline_router();

    let response = send(&app, "GET", "/healthz", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_readyz_reports_unavailable_database() {
    let app = offline_router();

    let response = send(&app, "GET", "/readyz", None, None).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() {
    let app = offline_router();
    send(&app, "GET", "/healthz", None, None).await;

    let response = send(&app, "GET", "/metrics", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("stagehand_http_requests_total"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = offline_router();

    let response = send(&app, "GET", "/docs/openapi.json", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/v1/deployments/dispatch"].is_object());
}
