/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Project management endpoints (admin only).

use crate::api::v1::middleware::AuthPayload;
use crate::api::v1::{api_error, db_error, require_admin, ApiError};
use crate::api::AppState;
use crate::dal::DAL;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use stagehand_models::models::changelog::{
    NewChangelogEntry, ACTION_PROJECT_CREATED, ACTION_PROJECT_DELETED, ACTION_PROJECT_UPDATED,
};
use stagehand_models::models::projects::{NewProject, Project, UpdateProject};
use stagehand_utils::logging::prelude::*;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

fn log_change(dal: &DAL, action: &str, actor: &str, project_id: Uuid, message: String) {
    match NewChangelogEntry::new(action, actor, message) {
        Ok(entry) => {
            if let Err(e) = dal.changelog().create(&entry.for_project(project_id)) {
                error!("Failed to write changelog entry: {:?}", e);
            }
        }
        Err(e) => error!("Invalid changelog entry: {}", e),
    }
}

fn write_error(context: &str, e: DieselError) -> ApiError {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            warn!("{}: project name already exists", context);
            api_error(StatusCode::CONFLICT, "A project with this name already exists")
        }
        other => db_error(context, other),
    }
}

/// Lists all projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    responses(
        (status = 200, description = "List of projects", body = Vec<Project>),
        (status = 403, description = "Admin access required"),
        (status = 500, description = "Internal server error"),
    ),
    security(("admin_pak" = []))
)]
pub async fn list_projects(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
) -> Result<Json<Vec<Project>>, ApiError> {
    info!("Handling request to list projects");
    require_admin(&auth_payload, "list projects")?;

    let projects = dal
        .projects()
        .list()
        .map_err(|e| db_error("Failed to fetch projects", e))?;
    info!("Successfully retrieved {} projects", projects.len());
    Ok(Json(projects))
}

/// Creates a project.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "projects",
    request_body = NewProject,
    responses(
        (status = 200, description = "Project created", body = Project),
        (status = 400, description = "Invalid project"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Project name already exists"),
    ),
    security(("admin_pak" = []))
)]
pub async fn create_project(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Json(new_project): Json<NewProject>,
) -> Result<Json<Project>, ApiError> {
    info!("Handling request to create project {}", new_project.name);
    require_admin(&auth_payload, "create a project")?;

    new_project.validate().map_err(|e| {
        warn!("Rejected project: {}", e);
        api_error(StatusCode::BAD_REQUEST, e)
    })?;

    let project = dal
        .projects()
        .create(&new_project)
        .map_err(|e| write_error("Failed to create project", e))?;

    log_change(
        &dal,
        ACTION_PROJECT_CREATED,
        auth_payload.actor_type(),
        project.id,
        format!("Created project {}", project.name),
    );
    info!("Successfully created project with ID: {}", project.id);
    Ok(Json(project))
}

/// Retrieves a project.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project found", body = Project),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project not found"),
    ),
    security(("admin_pak" = []))
)]
pub async fn get_project(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    info!("Handling request to get project with ID: {}", id);
    require_admin(&auth_payload, "get a project")?;

    match dal.projects().get(id) {
        Ok(Some(project)) => Ok(Json(project)),
        Ok(None) => {
            warn!("Project not found with ID: {}", id);
            Err(api_error(StatusCode::NOT_FOUND, "Project not found"))
        }
        Err(e) => Err(db_error("Failed to fetch project", e)),
    }
}

/// Applies a partial update to a project.
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = UpdateProject,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 400, description = "Invalid update"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project not found"),
    ),
    security(("admin_pak" = []))
)]
pub async fn update_project(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UpdateProject>,
) -> Result<Json<Project>, ApiError> {
    info!("Handling request to update project with ID: {}", id);
    require_admin(&auth_payload, "update a project")?;

    changes
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let existing = dal
        .projects()
        .get(id)
        .map_err(|e| db_error("Failed to fetch project", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Project not found"))?;

    if changes.is_empty() {
        return Ok(Json(existing));
    }

    let project = dal
        .projects()
        .update(id, &changes)
        .map_err(|e| write_error("Failed to update project", e))?;

    log_change(
        &dal,
        ACTION_PROJECT_UPDATED,
        auth_payload.actor_type(),
        project.id,
        format!("Updated project {}", project.name),
    );
    info!("Successfully updated project with ID: {}", id);
    Ok(Json(project))
}

/// Deletes a project together with its deployments.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project not found"),
    ),
    security(("admin_pak" = []))
)]
pub async fn delete_project(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    info!("Handling request to delete project with ID: {}", id);
    require_admin(&auth_payload, "delete a project")?;

    match dal.projects().delete(id) {
        Ok(0) => Err(api_error(StatusCode::NOT_FOUND, "Project not found")),
        Ok(_) => {
            log_change(
                &dal,
                ACTION_PROJECT_DELETED,
                auth_payload.actor_type(),
                id,
                format!("Deleted project {}", id),
            );
            info!("Successfully deleted project with ID: {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(db_error("Failed to delete project", e)),
    }
}
