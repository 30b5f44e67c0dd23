/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for the append-only changelog.

use crate::dal::DAL;
use diesel::prelude::*;
use stagehand_models::models::changelog::{ChangelogEntry, NewChangelogEntry};
use stagehand_models::schema::changelog_entries;
use uuid::Uuid;

/// Default number of entries returned by a listing.
pub const DEFAULT_CHANGELOG_LIMIT: i64 = 100;

/// Data Access Layer for changelog entries.
pub struct ChangelogDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl ChangelogDAL<'_> {
    /// Appends an entry.
    pub fn create(&self, entry: &NewChangelogEntry) -> Result<ChangelogEntry, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::insert_into(changelog_entries::table)
            .values(entry)
            .get_result(conn)
    }

    /// Lists entries newest first.
    ///
    /// # Arguments
    ///
    /// * `project_id` - Only entries for this project.
    /// * `deployment_id` - Only entries for this deployment.
    /// * `limit` - Maximum number of entries, defaults to [`DEFAULT_CHANGELOG_LIMIT`].
    pub fn list_filtered(
        &self,
        project_id: Option<Uuid>,
        deployment_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<ChangelogEntry>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");

        let mut query = changelog_entries::table.into_boxed();

        if let Some(p) = project_id {
            query = query.filter(changelog_entries::project_id.eq(p));
        }

        if let Some(d) = deployment_id {
            query = query.filter(changelog_entries::deployment_id.eq(d));
        }

        query
            .order(changelog_entries::created_at.desc())
            .limit(limit.unwrap_or(DEFAULT_CHANGELOG_LIMIT))
            .load::<ChangelogEntry>(conn)
    }
}
