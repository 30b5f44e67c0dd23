/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # API Routes Aggregator Module
//!
//! Builds the broker's HTTP surface: the authenticated `/api/v1` tree, health
//! and readiness probes, Prometheus metrics and the OpenAPI documentation.

pub mod v1;

use crate::dal::DAL;
use crate::github::GitHubClient;
use crate::metrics;
use crate::orchestrator::OrchestratorConfig;
use axum::{
    body::Body,
    extract::{FromRef, MatchedPath, State},
    http::{HeaderName, HeaderValue, Method, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use hyper::StatusCode;
use stagehand_utils::config::Cors;
use stagehand_utils::logging::prelude::*;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dal: DAL,
    pub github: GitHubClient,
    pub orchestrator: OrchestratorConfig,
}

impl FromRef<AppState> for DAL {
    fn from_ref(state: &AppState) -> DAL {
        state.dal.clone()
    }
}

/// Configures and returns the main application router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared handler state
/// * `cors` - CORS settings for browser clients such as the admin panel
pub fn configure_api_routes(state: AppState, cors: &Cors) -> Router<AppState> {
    Router::new()
        .nest("/api/v1", v1::routes(state.dal.clone()))
        .merge(v1::openapi::configure_openapi())
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .layer(build_cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(track_metrics))
}

/// Builds the CORS layer. A single `"*"` origin allows every origin.
pub fn build_cors_layer(cors: &Cors) -> CorsLayer {
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse::<Method>().ok())
        .collect();
    let headers: Vec<HeaderName> = cors
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse::<HeaderName>().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(cors.max_age_seconds));

    if cors.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                error!("Invalid CORS origin '{}' ignored", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;
    metrics::record_http_request(&endpoint, &method, response.status().as_u16());
    response
}

/// Health check endpoint handler. Always 200 while the process serves requests.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready check endpoint handler. 503 until a database connection can be checked out.
async fn readyz(State(dal): State<DAL>) -> impl IntoResponse {
    match dal.pool.get() {
        Ok(_) => (StatusCode::OK, "Ready"),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}

/// Metrics endpoint handler in Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}
