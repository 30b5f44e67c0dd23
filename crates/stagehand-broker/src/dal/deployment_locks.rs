/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for per-target deployment locks.
//!
//! A lock row exists for at most one deployment per `(project_id, deployment_stage)`.
//! A held lock can be taken over when it has expired or when the deployment
//! holding it has already reached a terminal status.

use crate::dal::DAL;
use chrono::Utc;
use diesel::prelude::*;
use stagehand_models::models::deployment_locks::{DeploymentLock, NewDeploymentLock};
use stagehand_models::models::deployments::DeploymentStatus;
use stagehand_models::schema::{deployment_locks, deployments};
use uuid::Uuid;

/// Data Access Layer for deployment locks.
pub struct DeploymentLocksDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

/// Result of trying to take a target lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The caller now holds the lock.
    Acquired(DeploymentLock),
    /// Another live deployment holds the lock.
    Held(DeploymentLock),
}

impl DeploymentLocksDAL<'_> {
    /// Tries to take the lock for the target named in `new_lock`.
    ///
    /// Re-acquiring a lock already held by the same deployment succeeds.
    pub fn acquire(
        &self,
        new_lock: &NewDeploymentLock,
    ) -> Result<LockAcquisition, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");

        conn.transaction(|conn| {
            let existing: Option<DeploymentLock> = deployment_locks::table
                .filter(deployment_locks::project_id.eq(new_lock.project_id))
                .filter(deployment_locks::deployment_stage.eq(&new_lock.deployment_stage))
                .for_update()
                .first(conn)
                .optional()?;

            if let Some(lock) = existing {
                if lock.deployment_id == new_lock.deployment_id {
                    return Ok(LockAcquisition::Acquired(lock));
                }

                let holder_status: Option<String> = deployments::table
                    .filter(deployments::id.eq(lock.deployment_id))
                    .select(deployments::status)
                    .first(conn)
                    .optional()?;
                let holder_finished = holder_status
                    .and_then(|s| s.parse::<DeploymentStatus>().ok())
                    .map_or(true, |s| s.is_terminal());

                if !lock.is_expired(Utc::now()) && !holder_finished {
                    return Ok(LockAcquisition::Held(lock));
                }

                diesel::delete(deployment_locks::table.filter(deployment_locks::id.eq(lock.id)))
                    .execute(conn)?;
            }

            let inserted: Option<DeploymentLock> = diesel::insert_into(deployment_locks::table)
                .values(new_lock)
                .on_conflict_do_nothing()
                .get_result(conn)
                .optional()?;

            match inserted {
                Some(lock) => Ok(LockAcquisition::Acquired(lock)),
                None => {
                    // Another transaction inserted between our read and write.
                    let winner: DeploymentLock = deployment_locks::table
                        .filter(deployment_locks::project_id.eq(new_lock.project_id))
                        .filter(deployment_locks::deployment_stage.eq(&new_lock.deployment_stage))
                        .first(conn)?;
                    Ok(LockAcquisition::Held(winner))
                }
            }
        })
    }

    /// Retrieves the lock for a target, if any.
    pub fn get_for_target(
        &self,
        project_id: Uuid,
        stage: &str,
    ) -> Result<Option<DeploymentLock>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        deployment_locks::table
            .filter(deployment_locks::project_id.eq(project_id))
            .filter(deployment_locks::deployment_stage.eq(stage))
            .first(conn)
            .optional()
    }

    /// Lists every lock currently stored.
    pub fn list(&self) -> Result<Vec<DeploymentLock>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        deployment_locks::table
            .order(deployment_locks::acquired_at.desc())
            .load::<DeploymentLock>(conn)
    }

    /// Releases whatever lock the deployment holds.
    ///
    /// # Returns
    ///
    /// Returns the number of locks removed (0 or 1).
    pub fn release(&self, deployment_id: Uuid) -> Result<usize, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::delete(
            deployment_locks::table.filter(deployment_locks::deployment_id.eq(deployment_id)),
        )
        .execute(conn)
    }
}
