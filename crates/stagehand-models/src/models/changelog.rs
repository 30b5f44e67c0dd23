/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Changelog entries: append-only records of deployment and configuration actions.

use crate::models::deployments::Stage;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// Constants
// =============================================================================

/// Actor type for admin users.
pub const ACTOR_TYPE_ADMIN: &str = "admin";
/// Actor type for CI runners.
pub const ACTOR_TYPE_RUNNER: &str = "runner";
/// Actor type for broker-internal operations such as the timeout sweeper.
pub const ACTOR_TYPE_SYSTEM: &str = "system";

pub const VALID_ACTOR_TYPES: &[&str] = &[ACTOR_TYPE_ADMIN, ACTOR_TYPE_RUNNER, ACTOR_TYPE_SYSTEM];

pub const ACTION_DEPLOYMENT_CREATED: &str = "deployment.created";
pub const ACTION_DEPLOYMENT_DISPATCHED: &str = "deployment.dispatched";
pub const ACTION_DEPLOYMENT_DEPLOYED: &str = "deployment.deployed";
pub const ACTION_DEPLOYMENT_FAILED: &str = "deployment.failed";
pub const ACTION_DEPLOYMENT_TIMED_OUT: &str = "deployment.timed_out";
pub const ACTION_DEPLOYMENT_DELETED: &str = "deployment.deleted";
pub const ACTION_PROJECT_CREATED: &str = "project.created";
pub const ACTION_PROJECT_UPDATED: &str = "project.updated";
pub const ACTION_PROJECT_DELETED: &str = "project.deleted";

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::schema::changelog_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[schema(example = json!({
    "id": "123e4567-e89b-12d3-a456-426614174000",
    "created_at": "2025-01-01T00:00:01Z",
    "action": "deployment.dispatched",
    "actor_type": "admin",
    "project_id": "123e4567-e89b-12d3-a456-426614174001",
    "deployment_id": "123e4567-e89b-12d3-a456-426614174002",
    "deployment_stage": "stage",
    "message": "Dispatched deploy-to-stage for portfolio to octo/portfolio-stage",
    "details": {"target_repo": "octo/portfolio-stage"}
}))]
pub struct ChangelogEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub action: String,
    pub actor_type: String,
    pub project_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub deployment_stage: Option<String>,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::changelog_entries)]
pub struct NewChangelogEntry {
    pub action: String,
    pub actor_type: String,
    pub project_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub deployment_stage: Option<String>,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl NewChangelogEntry {
    pub fn new(action: &str, actor_type: &str, message: impl Into<String>) -> Result<Self, String> {
        if action.trim().is_empty() {
            return Err("Action cannot be empty".to_string());
        }
        if !VALID_ACTOR_TYPES.contains(&actor_type) {
            return Err(format!("Invalid actor type '{}'", actor_type));
        }
        let message = message.into();
        if message.trim().is_empty() {
            return Err("Message cannot be empty".to_string());
        }

        Ok(NewChangelogEntry {
            action: action.to_string(),
            actor_type: actor_type.to_string(),
            project_id: None,
            deployment_id: None,
            deployment_stage: None,
            message,
            details: None,
        })
    }

    pub fn for_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn for_deployment(mut self, deployment_id: Uuid, stage: Stage) -> Self {
        self.deployment_id = Some(deployment_id);
        self.deployment_stage = Some(stage.as_str().to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
