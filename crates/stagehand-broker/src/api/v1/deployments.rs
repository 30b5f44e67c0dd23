/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Deployment endpoints: the dispatch trigger, status reporting and the
//! read/delete surface used by the admin panel and the CI runner.

use crate::api::v1::middleware::AuthPayload;
use crate::api::v1::{api_error, db_error, require_admin, require_admin_or_runner, ApiError};
use crate::api::AppState;
use crate::dal::DAL;
use crate::orchestrator::{self, DispatchRequest, DispatchResponse, OrchestrationError};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stagehand_models::models::changelog::{
    NewChangelogEntry, ACTION_DEPLOYMENT_CREATED, ACTION_DEPLOYMENT_DELETED,
};
use stagehand_models::models::deployments::{
    Deployment, DeploymentStatus, NewDeployment, Stage, StatusChange,
};
use stagehand_models::models::projects::Project;
use stagehand_utils::logging::prelude::*;
use utoipa::ToSchema;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/deployments", get(list_deployments).post(create_deployment))
        .route("/deployments/dispatch", post(dispatch_deployment))
        .route("/deployments/status", post(update_status))
        .route(
            "/deployments/:id",
            get(get_deployment).delete(delete_deployment),
        )
        .route("/deployments/:id/context", get(get_deployment_context))
        .route("/projects/:id/deploy", post(deploy_project))
}

/// Request body for creating a pending deployment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDeploymentRequest {
    pub project_id: Uuid,
    pub deployment_stage: Stage,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for creating and dispatching a deployment in one call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeployProjectRequest {
    pub deployment_stage: Stage,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Status report from the runner or an admin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    pub deployment_id: Uuid,
    pub status: DeploymentStatus,
    #[serde(default)]
    pub deployment_url: Option<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
}

/// What the runner needs beyond the three-field dispatch payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeploymentContext {
    pub deployment_id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub deployment_stage: Stage,
    pub status: DeploymentStatus,
    pub source_repo: String,
    pub target_repo: Option<String>,
    pub target_branch: String,
    pub deployment_url: Option<String>,
    pub build_command: String,
    pub build_output_dir: String,
}

impl DeploymentContext {
    pub fn new(project: &Project, deployment: &Deployment) -> Result<Self, String> {
        let stage = deployment.stage()?;
        let target = project.target_for(stage);
        Ok(DeploymentContext {
            deployment_id: deployment.id,
            project_id: project.id,
            project_name: project.name.clone(),
            deployment_stage: stage,
            status: deployment.current_status()?,
            source_repo: project.source_repo.clone(),
            target_repo: target.repo.map(String::from),
            target_branch: target.branch.to_string(),
            deployment_url: target.url.map(String::from),
            build_command: project.build_command.clone(),
            build_output_dir: project.build_output_dir.clone(),
        })
    }
}

/// Query parameters for listing deployments.
#[derive(Debug, Default, Deserialize)]
pub struct DeploymentFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<String>,
    pub stage: Option<String>,
}

/// Maps orchestration failures onto HTTP statuses.
pub fn orchestration_error(err: &OrchestrationError) -> ApiError {
    let status = match err {
        OrchestrationError::ProjectNotFound(_) | OrchestrationError::DeploymentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        OrchestrationError::DeploymentMismatch(_) | OrchestrationError::ProjectInactive(_) => {
            StatusCode::BAD_REQUEST
        }
        OrchestrationError::InvalidTransition { .. }
        | OrchestrationError::DeploymentInProgress { .. } => StatusCode::CONFLICT,
        OrchestrationError::MissingRepositoryConfig { .. }
        | OrchestrationError::DispatchFailed { .. }
        | OrchestrationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

fn create_pending(
    dal: &DAL,
    project_id: Uuid,
    stage: Stage,
    notes: Option<String>,
    actor_type: &str,
) -> Result<Deployment, ApiError> {
    let project = dal
        .projects()
        .get(project_id)
        .map_err(|e| db_error("Failed to fetch project", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Project not found"))?;

    if !project.active {
        warn!("Refusing deployment of inactive project {}", project.name);
        return Err(api_error(StatusCode::BAD_REQUEST, "Project is not active"));
    }

    let new_deployment = NewDeployment::new(project.id, stage, notes)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let deployment = dal
        .deployments()
        .create(&new_deployment)
        .map_err(|e| db_error("Failed to create deployment", e))?;

    match NewChangelogEntry::new(
        ACTION_DEPLOYMENT_CREATED,
        actor_type,
        format!("Requested {} deployment of {}", stage, project.name),
    ) {
        Ok(entry) => {
            let entry = entry
                .for_project(project.id)
                .for_deployment(deployment.id, stage);
            if let Err(e) = dal.changelog().create(&entry) {
                error!("Failed to write changelog entry: {:?}", e);
            }
        }
        Err(e) => error!("Invalid changelog entry: {}", e),
    }

    info!(
        "Created pending deployment {} of {} to {}",
        deployment.id, project.name, stage
    );
    Ok(deployment)
}

/// Lists deployments, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/deployments",
    tag = "deployments",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Only deployments of this project"),
        ("status" = Option<String>, Query, description = "pending, approved, deployed or failed"),
        ("stage" = Option<String>, Query, description = "stage or prod")
    ),
    responses(
        (status = 200, description = "List of deployments", body = Vec<Deployment>),
        (status = 400, description = "Invalid filter"),
        (status = 403, description = "Admin access required"),
    ),
    security(("admin_pak" = []))
)]
pub async fn list_deployments(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Query(filter): Query<DeploymentFilter>,
) -> Result<Json<Vec<Deployment>>, ApiError> {
    info!("Handling request to list deployments");
    require_admin(&auth_payload, "list deployments")?;

    let status = filter
        .status
        .as_deref()
        .map(str::parse::<DeploymentStatus>)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let stage = filter
        .stage
        .as_deref()
        .map(str::parse::<Stage>)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let deployments = dal
        .deployments()
        .list_filtered(
            filter.project_id,
            status.map(|s| s.as_str()),
            stage.map(|s| s.as_str()),
        )
        .map_err(|e| db_error("Failed to fetch deployments", e))?;
    info!("Successfully retrieved {} deployments", deployments.len());
    Ok(Json(deployments))
}

/// Records a new `pending` deployment without dispatching it.
#[utoipa::path(
    post,
    path = "/api/v1/deployments",
    tag = "deployments",
    request_body = CreateDeploymentRequest,
    responses(
        (status = 200, description = "Deployment created", body = Deployment),
        (status = 400, description = "Project inactive"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project not found"),
    ),
    security(("admin_pak" = []))
)]
pub async fn create_deployment(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Json(request): Json<CreateDeploymentRequest>,
) -> Result<Json<Deployment>, ApiError> {
    info!(
        "Handling request to create a {} deployment for project {}",
        request.deployment_stage, request.project_id
    );
    require_admin(&auth_payload, "create a deployment")?;

    create_pending(
        &dal,
        request.project_id,
        request.deployment_stage,
        request.notes,
        auth_payload.actor_type(),
    )
    .map(Json)
}

/// Retrieves a deployment.
#[utoipa::path(
    get,
    path = "/api/v1/deployments/{id}",
    tag = "deployments",
    params(("id" = Uuid, Path, description = "Deployment ID")),
    responses(
        (status = 200, description = "Deployment found", body = Deployment),
        (status = 404, description = "Deployment not found"),
    ),
    security(("admin_pak" = []), ("runner_pak" = []))
)]
pub async fn get_deployment(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deployment>, ApiError> {
    info!("Handling request to get deployment with ID: {}", id);
    require_admin_or_runner(&auth_payload, "get a deployment")?;

    match dal.deployments().get(id) {
        Ok(Some(deployment)) => Ok(Json(deployment)),
        Ok(None) => {
            warn!("Deployment not found with ID: {}", id);
            Err(api_error(StatusCode::NOT_FOUND, "Deployment not found"))
        }
        Err(e) => Err(db_error("Failed to fetch deployment", e)),
    }
}

/// Deletes a deployment record.
#[utoipa::path(
    delete,
    path = "/api/v1/deployments/{id}",
    tag = "deployments",
    params(("id" = Uuid, Path, description = "Deployment ID")),
    responses(
        (status = 204, description = "Deployment deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Deployment not found"),
    ),
    security(("admin_pak" = []))
)]
pub async fn delete_deployment(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    info!("Handling request to delete deployment with ID: {}", id);
    require_admin(&auth_payload, "delete a deployment")?;

    let deployment = dal
        .deployments()
        .get(id)
        .map_err(|e| db_error("Failed to fetch deployment", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Deployment not found"))?;

    dal.deployments()
        .delete(id)
        .map_err(|e| db_error("Failed to delete deployment", e))?;

    if let Ok(entry) = NewChangelogEntry::new(
        ACTION_DEPLOYMENT_DELETED,
        auth_payload.actor_type(),
        format!("Deleted deployment {}", id),
    ) {
        let entry = entry.for_project(deployment.project_id);
        let entry = match deployment.stage() {
            Ok(stage) => entry.for_deployment(id, stage),
            Err(_) => entry,
        };
        if let Err(e) = dal.changelog().create(&entry) {
            error!("Failed to write changelog entry: {:?}", e);
        }
    }

    info!("Successfully deleted deployment with ID: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the project and target details the runner needs for a deployment.
#[utoipa::path(
    get,
    path = "/api/v1/deployments/{id}/context",
    tag = "deployments",
    params(("id" = Uuid, Path, description = "Deployment ID")),
    responses(
        (status = 200, description = "Deployment context", body = DeploymentContext),
        (status = 404, description = "Deployment not found"),
    ),
    security(("admin_pak" = []), ("runner_pak" = []))
)]
pub async fn get_deployment_context(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeploymentContext>, ApiError> {
    info!("Handling request for context of deployment {}", id);
    require_admin_or_runner(&auth_payload, "read deployment context")?;

    let deployment = dal
        .deployments()
        .get(id)
        .map_err(|e| db_error("Failed to fetch deployment", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Deployment not found"))?;
    let project = dal
        .projects()
        .get(deployment.project_id)
        .map_err(|e| db_error("Failed to fetch project", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Project not found"))?;

    DeploymentContext::new(&project, &deployment)
        .map(Json)
        .map_err(|e| {
            error!("Deployment {} has invalid data: {}", id, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        })
}

/// Approves a pending deployment and sends the repository-dispatch event.
#[utoipa::path(
    post,
    path = "/api/v1/deployments/dispatch",
    tag = "deployments",
    request_body = DispatchRequest,
    responses(
        (status = 200, description = "Dispatch accepted upstream", body = DispatchResponse),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project or deployment not found"),
        (status = 409, description = "Target locked or deployment not pending"),
        (status = 500, description = "Missing repository configuration or dispatch failure"),
    ),
    security(("admin_pak" = []))
)]
pub async fn dispatch_deployment(
    State(state): State<AppState>,
    Extension(auth_payload): Extension<AuthPayload>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    info!(
        "Handling dispatch request for deployment {}",
        request.deployment_id
    );
    require_admin(&auth_payload, "dispatch a deployment")?;

    orchestrator::dispatch_deployment(
        &state.dal,
        &state.github,
        &state.orchestrator,
        &request,
        auth_payload.actor_type(),
    )
    .await
    .map(Json)
    .map_err(|e| orchestration_error(&e))
}

/// Creates a pending deployment for the project and dispatches it.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/deploy",
    tag = "deployments",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = DeployProjectRequest,
    responses(
        (status = 200, description = "Dispatch accepted upstream", body = DispatchResponse),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Project not found"),
        (status = 409, description = "Target locked"),
        (status = 500, description = "Missing repository configuration or dispatch failure"),
    ),
    security(("admin_pak" = []))
)]
pub async fn deploy_project(
    State(state): State<AppState>,
    Extension(auth_payload): Extension<AuthPayload>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<DeployProjectRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    info!(
        "Handling request to deploy project {} to {}",
        project_id, request.deployment_stage
    );
    require_admin(&auth_payload, "deploy a project")?;

    let deployment = create_pending(
        &state.dal,
        project_id,
        request.deployment_stage,
        request.notes,
        auth_payload.actor_type(),
    )?;

    let dispatch = DispatchRequest {
        deployment_id: deployment.id,
        project_id,
        deployment_stage: request.deployment_stage,
    };

    orchestrator::dispatch_deployment(
        &state.dal,
        &state.github,
        &state.orchestrator,
        &dispatch,
        auth_payload.actor_type(),
    )
    .await
    .map(Json)
    .map_err(|e| {
        let (status, _) = orchestration_error(&e);
        (
            status,
            Json(serde_json::json!({
                "error": e.to_string(),
                "deployment_id": deployment.id,
            })),
        )
    })
}

/// Records a terminal status for a deployment.
#[utoipa::path(
    post,
    path = "/api/v1/deployments/status",
    tag = "deployments",
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status recorded", body = StatusUpdateResponse),
        (status = 400, description = "Invalid status report"),
        (status = 404, description = "Deployment not found"),
        (status = 409, description = "Illegal status transition"),
    ),
    security(("admin_pak" = []), ("runner_pak" = []))
)]
pub async fn update_status(
    State(dal): State<DAL>,
    Extension(auth_payload): Extension<AuthPayload>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    info!(
        "Handling status update for deployment {}: {}",
        request.deployment_id, request.status
    );
    require_admin_or_runner(&auth_payload, "report deployment status")?;

    let change = StatusChange::new(
        request.status,
        request.deployment_url,
        request.commit_hash,
        request.error_message,
        request.notes,
    )
    .map_err(|e| {
        warn!("Rejected status report: {}", e);
        api_error(StatusCode::BAD_REQUEST, e)
    })?;

    let deployment = orchestrator::apply_status_update(
        &dal,
        request.deployment_id,
        &change,
        auth_payload.actor_type(),
    )
    .map_err(|e| orchestration_error(&e))?;

    Ok(Json(StatusUpdateResponse {
        success: true,
        message: format!("Deployment {} is now {}", deployment.id, deployment.status),
    }))
}
