/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api::v1::middleware::AuthPayload;
use crate::api::v1::{db_error, require_admin, ApiError};
use crate::api::AppState;
use crate::dal::DAL;
use axum::{
    extract::{Extension, State},
    routing::get,
    Json, Router,
};
use stagehand_models::models::runners::Runner;
use stagehand_utils::logging::prelude::*;

pub fn routes() -> Router<AppState> {
    Router::new().route("/runners", get(list_runners))
}

/// Lists registered runners. Key hashes are never serialized.
#[utoipa::path(
    get,
    path = "/api/v1/runners",
    tag = "runners",
    responses(
        (status = 200, description = "List of runners", body = Vec<Runner>),
        (status = 403, description = "Admin access required"),
    ),
    security(("admin_pak" = []))
)]
pub async fn list_runners(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
) -> Result<Json<Vec<Runner>>, ApiError> {
    info!("Handling request to list runners");
    require_admin(&auth_payload, "list runners")?;

    dal.runners()
        .list()
        .map(Json)
        .map_err(|e| db_error("Failed to fetch runners", e))
}
