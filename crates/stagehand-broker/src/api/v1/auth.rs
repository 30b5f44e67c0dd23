/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Authentication module for the Stagehand API v1.

use crate::api::v1::middleware::{AuthPayload, AuthResponse};
use crate::api::AppState;
use axum::extract::Extension;
use axum::{routing::post, Json, Router};

/// Creates and returns the authentication routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/pak", post(verify_pak))
}

/// Reports who the presented PAK belongs to.
#[utoipa::path(
    post,
    path = "/api/v1/auth/pak",
    tag = "auth",
    responses(
        (status = 200, description = "PAK verified successfully", body = AuthResponse),
        (status = 401, description = "Invalid PAK"),
    ),
    security(
        ("admin_pak" = []),
        ("runner_pak" = [])
    )
)]
pub async fn verify_pak(Extension(auth_payload): Extension<AuthPayload>) -> Json<AuthResponse> {
    Json(AuthResponse {
        admin: auth_payload.admin,
        runner: auth_payload.runner.map(|id| id.to_string()),
    })
}
