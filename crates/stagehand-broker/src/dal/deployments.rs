/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for Deployment operations.
//!
//! Status writes are single-row conditional updates: the `WHERE status IN (...)`
//! clause carries the allowed predecessors of the new status, so a writer that
//! lost a race gets `NotFound` instead of overwriting a terminal state.
//! A `deployed` write never carries an error message.

use crate::dal::DAL;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use stagehand_models::models::deployments::{
    Deployment, DeploymentStatus, NewDeployment, StatusChange,
};
use stagehand_models::schema::{deployment_locks, deployments};
use uuid::Uuid;

/// Data Access Layer for Deployment operations.
pub struct DeploymentsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

#[derive(AsChangeset)]
#[diesel(table_name = deployments)]
struct StatusChangeset<'a> {
    status: &'a str,
    deployed_at: Option<DateTime<Utc>>,
    commit_hash: Option<&'a str>,
    deployment_url: Option<&'a str>,
    error_message: Option<&'a str>,
    notes: Option<&'a str>,
}

impl<'a> StatusChangeset<'a> {
    fn from_change(change: &'a StatusChange, now: DateTime<Utc>) -> Self {
        let deployed = change.status == DeploymentStatus::Deployed;
        StatusChangeset {
            status: change.status.as_str(),
            deployed_at: deployed.then_some(now),
            commit_hash: if deployed {
                change.commit_hash.as_deref()
            } else {
                None
            },
            deployment_url: if deployed {
                change.deployment_url.as_deref()
            } else {
                None
            },
            error_message: if deployed {
                None
            } else {
                change.error_message.as_deref()
            },
            notes: change.notes.as_deref(),
        }
    }
}

fn status_strs(statuses: &[DeploymentStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

impl DeploymentsDAL<'_> {
    /// Creates a new deployment record. New deployments are always `pending`.
    pub fn create(
        &self,
        new_deployment: &NewDeployment,
    ) -> Result<Deployment, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::insert_into(deployments::table)
            .values(new_deployment)
            .get_result(conn)
    }

    /// Retrieves a deployment by its UUID.
    pub fn get(&self, deployment_id: Uuid) -> Result<Option<Deployment>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        deployments::table
            .filter(deployments::id.eq(deployment_id))
            .first(conn)
            .optional()
    }

    /// Lists deployments newest first, optionally filtered by project, status and stage.
    pub fn list_filtered(
        &self,
        project_id: Option<Uuid>,
        status: Option<&str>,
        stage: Option<&str>,
    ) -> Result<Vec<Deployment>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");

        let mut query = deployments::table.into_boxed();

        if let Some(p) = project_id {
            query = query.filter(deployments::project_id.eq(p));
        }

        if let Some(s) = status {
            query = query.filter(deployments::status.eq(s));
        }

        if let Some(st) = stage {
            query = query.filter(deployments::deployment_stage.eq(st));
        }

        query
            .order(deployments::created_at.desc())
            .load::<Deployment>(conn)
    }

    /// Deletes a deployment (hard delete). Its lock, if any, goes with it via CASCADE.
    pub fn delete(&self, deployment_id: Uuid) -> Result<usize, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::delete(deployments::table.filter(deployments::id.eq(deployment_id))).execute(conn)
    }

    /// Moves a deployment from `pending` to `approved`, stamping `approved_at`.
    ///
    /// Returns NotFound if the deployment doesn't exist or is no longer pending.
    pub fn approve(&self, deployment_id: Uuid) -> Result<Deployment, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");

        diesel::update(
            deployments::table
                .filter(deployments::id.eq(deployment_id))
                .filter(
                    deployments::status.eq_any(status_strs(
                        DeploymentStatus::Approved.predecessors(),
                    )),
                ),
        )
        .set((
            deployments::status.eq(DeploymentStatus::Approved.as_str()),
            deployments::approved_at.eq(Utc::now()),
        ))
        .get_result(conn)
    }

    /// Writes a status change if the deployment is currently in one of the
    /// allowed predecessor states of `change.status`.
    ///
    /// `deployed` stamps `deployed_at` and stores the URL and commit hash.
    /// Error message and notes are stored whenever present.
    ///
    /// Returns NotFound if the deployment doesn't exist or the transition is illegal.
    pub fn apply_change(
        &self,
        deployment_id: Uuid,
        change: &StatusChange,
    ) -> Result<Deployment, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");

        let allowed = status_strs(change.status.predecessors());
        if allowed.is_empty() {
            return Err(diesel::result::Error::NotFound);
        }

        diesel::update(
            deployments::table
                .filter(deployments::id.eq(deployment_id))
                .filter(deployments::status.eq_any(allowed)),
        )
        .set(&StatusChangeset::from_change(change, Utc::now()))
        .get_result(conn)
    }

    /// Lists deployments still `pending` or `approved` that were created before `cutoff`.
    pub fn list_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Deployment>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        deployments::table
            .filter(deployments::status.eq_any(status_strs(
                DeploymentStatus::Failed.predecessors(),
            )))
            .filter(deployments::created_at.lt(cutoff))
            .order(deployments::created_at.asc())
            .load::<Deployment>(conn)
    }

    /// Fails every non-terminal deployment created before `cutoff` and releases
    /// the locks they hold, in one transaction.
    ///
    /// # Returns
    ///
    /// Returns the deployments that were failed.
    pub fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<Deployment>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");

        conn.transaction(|conn| {
            let failed: Vec<Deployment> = diesel::update(
                deployments::table
                    .filter(deployments::status.eq_any(status_strs(
                        DeploymentStatus::Failed.predecessors(),
                    )))
                    .filter(deployments::created_at.lt(cutoff)),
            )
            .set((
                deployments::status.eq(DeploymentStatus::Failed.as_str()),
                deployments::error_message.eq(message),
            ))
            .get_results(conn)?;

            if !failed.is_empty() {
                let ids: Vec<Uuid> = failed.iter().map(|d| d.id).collect();
                diesel::delete(
                    deployment_locks::table.filter(deployment_locks::deployment_id.eq_any(ids)),
                )
                .execute(conn)?;
            }

            Ok(failed)
        })
    }
}
