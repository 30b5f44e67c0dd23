/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! In-flight marker for a `(project_id, deployment_stage)` target.
//!
//! At most one row exists per target. A lock is held from dispatch until the
//! deployment reaches a terminal status; an expired lock may be taken over.

use crate::models::deployments::Stage;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema,
)]
#[diesel(table_name = crate::schema::deployment_locks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeploymentLock {
    pub id: Uuid,
    pub project_id: Uuid,
    pub deployment_stage: String,
    /// Deployment currently holding the target.
    pub deployment_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DeploymentLock {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::deployment_locks)]
pub struct NewDeploymentLock {
    pub project_id: Uuid,
    pub deployment_stage: String,
    pub deployment_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewDeploymentLock {
    pub fn new(
        project_id: Uuid,
        stage: Stage,
        deployment_id: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, String> {
        if ttl <= Duration::zero() {
            return Err("Lock TTL must be positive".to_string());
        }
        Ok(NewDeploymentLock {
            project_id,
            deployment_stage: stage.as_str().to_string(),
            deployment_id,
            acquired_at: now,
            expires_at: now + ttl,
        })
    }
}
