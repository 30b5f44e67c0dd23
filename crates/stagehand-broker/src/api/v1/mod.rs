/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Version 1 of the Stagehand API. Every route requires a PAK.

pub mod auth;
pub mod changelog;
pub mod deployments;
pub mod middleware;
pub mod openapi;
pub mod projects;
pub mod runners;

use crate::api::AppState;
use crate::dal::DAL;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::{Json, Router};
use middleware::AuthPayload;
use stagehand_utils::logging::prelude::*;

/// Error half of every handler result: a status and `{"error": ...}`.
pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({"error": message.into()})))
}

pub(crate) fn require_admin(auth_payload: &AuthPayload, action: &str) -> Result<(), ApiError> {
    if auth_payload.admin {
        Ok(())
    } else {
        warn!("Unauthorized attempt to {}", action);
        Err(api_error(StatusCode::FORBIDDEN, "Admin access required"))
    }
}

pub(crate) fn require_admin_or_runner(
    auth_payload: &AuthPayload,
    action: &str,
) -> Result<(), ApiError> {
    if auth_payload.is_admin_or_runner() {
        Ok(())
    } else {
        warn!("Unauthorized attempt to {}", action);
        Err(api_error(
            StatusCode::FORBIDDEN,
            "Admin or runner access required",
        ))
    }
}

pub(crate) fn db_error(context: &str, e: diesel::result::Error) -> ApiError {
    error!("{}: {:?}", context, e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context)
}

pub fn routes(dal: DAL) -> Router<AppState> {
    Router::new()
        .merge(projects::routes())
        .merge(deployments::routes())
        .merge(changelog::routes())
        .merge(runners::routes())
        .merge(auth::routes())
        .layer(from_fn_with_state(
            dal,
            middleware::auth_middleware::<axum::body::Body>,
        ))
}
