/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Authentication middleware for the Stagehand API v1.
//!
//! Requests carry a prefixed API key in the `Authorization` header, with or
//! without a `Bearer ` prefix. The key is matched against the admin role and
//! then against active runners.

use crate::dal::DAL;
use crate::utils::pak;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use diesel::prelude::*;
use serde::Serialize;
use stagehand_models::models::changelog::{ACTOR_TYPE_ADMIN, ACTOR_TYPE_RUNNER};
use stagehand_models::schema::admin_role;
use stagehand_utils::logging::prelude::*;
use utoipa::ToSchema;
use uuid::Uuid;

/// Represents the authenticated entity's payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthPayload {
    /// Indicates if the authenticated entity is an admin.
    pub admin: bool,
    /// The UUID of the authenticated runner, if applicable.
    pub runner: Option<Uuid>,
}

impl AuthPayload {
    /// Actor type recorded in the changelog for this caller.
    pub fn actor_type(&self) -> &'static str {
        if self.admin {
            ACTOR_TYPE_ADMIN
        } else {
            ACTOR_TYPE_RUNNER
        }
    }

    pub fn is_admin_or_runner(&self) -> bool {
        self.admin || self.runner.is_some()
    }
}

/// Represents the response structure for authentication information.
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    /// Indicates if the authenticated entity is an admin.
    pub admin: bool,
    /// The string representation of the runner's UUID, if applicable.
    pub runner: Option<String>,
}

/// Extracts the key from an `Authorization` header value.
pub fn extract_pak(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Middleware function for authenticating requests.
///
/// Verifies the PAK and adds the resulting [`AuthPayload`] to the request's extensions.
pub async fn auth_middleware<B>(
    State(dal): State<DAL>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    debug!("Processing authentication middleware");
    let pak = match request
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(extract_pak)
    {
        Some(pak) => pak.to_string(),
        None => {
            warn!("Authorization header missing or invalid");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    match verify_pak(&dal, &pak).await {
        Ok(auth_payload) => {
            debug!("Authentication successful");
            request.extensions_mut().insert(auth_payload);
            Ok(next.run(request).await)
        }
        Err(status) => {
            warn!("Authentication failed with status: {:?}", status);
            Err(status)
        }
    }
}

/// Verifies the provided PAK and returns the corresponding [`AuthPayload`].
async fn verify_pak(dal: &DAL, pak: &str) -> Result<AuthPayload, StatusCode> {
    let conn = &mut dal.pool.get().map_err(|e| {
        error!("Failed to get database connection: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let admin_key = admin_role::table
        .select(admin_role::pak_hash)
        .first::<String>(conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch admin role: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Some(admin_hash) = admin_key {
        if pak::verify_pak(pak, &admin_hash) {
            debug!("Admin PAK verified");
            return Ok(AuthPayload {
                admin: true,
                runner: None,
            });
        }
    }

    let runners = dal.runners().list_active().map_err(|e| {
        error!("Failed to fetch runners: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    for runner in runners {
        let Some(hash) = runner.pak_hash.as_deref() else {
            continue;
        };
        if pak::verify_pak(pak, hash) {
            debug!("Runner PAK verified for runner ID: {}", runner.id);
            if let Err(e) = dal.runners().record_activity(runner.id) {
                warn!("Failed to record activity for runner {}: {:?}", runner.id, e);
            }
            return Ok(AuthPayload {
                admin: false,
                runner: Some(runner.id),
            });
        }
    }

    warn!("PAK verification failed");
    Err(StatusCode::UNAUTHORIZED)
}
