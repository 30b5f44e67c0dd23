/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for Project operations.

use crate::dal::DAL;
use diesel::prelude::*;
use stagehand_models::models::projects::{NewProject, Project, UpdateProject};
use stagehand_models::schema::projects;
use uuid::Uuid;

/// Data Access Layer for Project operations.
pub struct ProjectsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl ProjectsDAL<'_> {
    /// Creates a new project in the database.
    ///
    /// # Returns
    ///
    /// Returns the created Project, or a diesel::result::Error on failure
    /// (including a unique violation when the name is taken).
    pub fn create(&self, new_project: &NewProject) -> Result<Project, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::insert_into(projects::table)
            .values(new_project)
            .get_result(conn)
    }

    /// Retrieves a project by its UUID.
    pub fn get(&self, project_id: Uuid) -> Result<Option<Project>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        projects::table
            .filter(projects::id.eq(project_id))
            .first(conn)
            .optional()
    }

    /// Retrieves a project by its unique name.
    pub fn get_by_name(&self, project_name: &str) -> Result<Option<Project>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        projects::table
            .filter(projects::name.eq(project_name))
            .first(conn)
            .optional()
    }

    /// Lists all projects ordered by name.
    pub fn list(&self) -> Result<Vec<Project>, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        projects::table
            .order(projects::name.asc())
            .load::<Project>(conn)
    }

    /// Applies a partial update to a project.
    ///
    /// Returns NotFound if the project doesn't exist.
    pub fn update(
        &self,
        project_id: Uuid,
        changes: &UpdateProject,
    ) -> Result<Project, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::update(projects::table.filter(projects::id.eq(project_id)))
            .set(changes)
            .get_result(conn)
    }

    /// Deletes a project. Deployments and locks go with it via CASCADE.
    ///
    /// # Returns
    ///
    /// Returns the number of affected rows.
    pub fn delete(&self, project_id: Uuid) -> Result<usize, diesel::result::Error> {
        let conn = &mut self.dal.pool.get().expect("Failed to get DB connection");
        diesel::delete(projects::table.filter(projects::id.eq(project_id))).execute(conn)
    }
}
