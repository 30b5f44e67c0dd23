/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Read access to the append-only audit log.

use crate::api::v1::middleware::AuthPayload;
use crate::api::v1::{db_error, require_admin, ApiError};
use crate::dal::DEFAULT_CHANGELOG_LIMIT;
use crate::dal::DAL;
use axum::{
    extract::{Extension, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use stagehand_models::models::changelog::ChangelogEntry;
use stagehand_utils::logging::prelude::*;
use uuid::Uuid;

const MAX_CHANGELOG_LIMIT: i64 = 1000;

pub fn routes() -> Router<crate::api::AppState> {
    Router::new().route("/changelog", get(list_changelog))
}

/// Query parameters for listing changelog entries.
#[derive(Debug, Default, Deserialize)]
pub struct ChangelogQuery {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub deployment_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl ChangelogQuery {
    /// Requested limit clamped to `1..=1000`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_CHANGELOG_LIMIT)
            .clamp(1, MAX_CHANGELOG_LIMIT)
    }
}

/// Lists changelog entries, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/changelog",
    tag = "changelog",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Only entries for this project"),
        ("deployment_id" = Option<Uuid>, Query, description = "Only entries for this deployment"),
        ("limit" = Option<i64>, Query, description = "Maximum number of entries (default: 100, max: 1000)")
    ),
    responses(
        (status = 200, description = "Changelog entries", body = Vec<ChangelogEntry>),
        (status = 403, description = "Admin access required"),
    ),
    security(("admin_pak" = []))
)]
pub async fn list_changelog(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Query(query): Query<ChangelogQuery>,
) -> Result<Json<Vec<ChangelogEntry>>, ApiError> {
    info!("Handling request to list changelog entries");
    require_admin(&auth_payload, "read the changelog")?;

    let entries = dal
        .changelog()
        .list_filtered(
            query.project_id,
            query.deployment_id,
            Some(query.effective_limit()),
        )
        .map_err(|e| db_error("Failed to fetch changelog", e))?;
    Ok(Json(entries))
}
