/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for Runner operations.

use crate::dal::DAL;
use chrono::Utc;
use diesel::prelude::*;
use stagehand_models::models::runners::{NewRunner, Runner};
use stagehand_models::schema::runners;
use uuid::Uuid;

/// Data Access Layer for Runner operations.
pub struct RunnersDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl RunnersDAL<'_> {
    /// Creates a new runner. The PAK hash is set separately with [`Self::update_pak_hash`].
    pub fn create(&self, new_runner: &NewRunner) -> Result<Runner, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::insert_into(runners::table)
            .values(new_runner)
            .get_result(conn)
    }

    /// Retrieves a runner by its UUID.
    pub fn get(&self, runner_id: Uuid) -> Result<Option<Runner>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        runners::table
            .filter(runners::id.eq(runner_id))
            .first(conn)
            .optional()
    }

    /// Lists all runners.
    pub fn list(&self) -> Result<Vec<Runner>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        runners::table.order(runners::name.asc()).load::<Runner>(conn)
    }

    /// Lists runners allowed to authenticate.
    pub fn list_active(&self) -> Result<Vec<Runner>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        runners::table
            .filter(runners::is_active.eq(true))
            .filter(runners::pak_hash.is_not_null())
            .load::<Runner>(conn)
    }

    /// Replaces a runner's PAK hash.
    pub fn update_pak_hash(
        &self,
        runner_id: Uuid,
        new_pak_hash: String,
    ) -> Result<Runner, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::update(runners::table.filter(runners::id.eq(runner_id)))
            .set(runners::pak_hash.eq(new_pak_hash))
            .get_result(conn)
    }

    /// Records that the runner just made an authenticated call.
    pub fn record_activity(&self, runner_id: Uuid) -> Result<usize, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::update(runners::table.filter(runners::id.eq(runner_id)))
            .set(runners::last_active_at.eq(Utc::now()))
            .execute(conn)
    }

    /// Enables or disables a runner.
    pub fn set_active(&self, runner_id: Uuid, active: bool) -> Result<Runner, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::update(runners::table.filter(runners::id.eq(runner_id)))
            .set(runners::is_active.eq(active))
            .get_result(conn)
    }
}
