/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api::v1::deployments::{
    CreateDeploymentRequest, DeployProjectRequest, DeploymentContext, StatusUpdateRequest,
    StatusUpdateResponse,
};
use crate::api::v1::middleware::AuthResponse;
use crate::api::v1::{auth, changelog, deployments, projects, runners};
use crate::api::AppState;
use crate::github::ClientPayload;
use crate::orchestrator::{DispatchRequest, DispatchResponse};
use axum::{response::Json, routing::get, Router};
use stagehand_models::models::{
    changelog::ChangelogEntry,
    deployments::{Deployment, DeploymentStatus, Stage},
    projects::{NewProject, Project, UpdateProject},
    runners::Runner,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        projects::list_projects,
        projects::create_project,
        projects::get_project,
        projects::update_project,
        projects::delete_project,
        deployments::list_deployments,
        deployments::create_deployment,
        deployments::get_deployment,
        deployments::delete_deployment,
        deployments::get_deployment_context,
        deployments::dispatch_deployment,
        deployments::deploy_project,
        deployments::update_status,
        changelog::list_changelog,
        runners::list_runners,
        auth::verify_pak,
    ),
    components(
        schemas(
            Project,
            NewProject,
            UpdateProject,
            Deployment,
            DeploymentStatus,
            Stage,
            CreateDeploymentRequest,
            DeployProjectRequest,
            DeploymentContext,
            DispatchRequest,
            DispatchResponse,
            ClientPayload,
            StatusUpdateRequest,
            StatusUpdateResponse,
            ChangelogEntry,
            Runner,
            AuthResponse,
        )
    ),
    tags(
        (name = "projects", description = "Project management API"),
        (name = "deployments", description = "Deployment dispatch and status API"),
        (name = "changelog", description = "Audit log API"),
        (name = "runners", description = "CI runner API"),
        (name = "auth", description = "Authentication API")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_pak",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
            components.add_security_scheme(
                "runner_pak",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

pub fn configure_openapi() -> Router<AppState> {
    Router::new()
        .route("/docs/openapi.json", get(serve_openapi))
        .merge(SwaggerUi::new("/swagger-ui"))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
