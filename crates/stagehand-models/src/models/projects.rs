/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Projects Module
//!
//! Deployment configuration for one portfolio property. The source repository
//! is the `dev` stage; `stage` and `prod` each name an optional target
//! repository, a branch and a public URL.
//!
//! ## Constraints
//!
//! - `name` must be non-empty and cannot exceed 255 characters.
//! - Repositories are `owner/name` slugs.
//! - A dispatch for a stage requires that stage's repository to be set;
//!   see [`Project::target_for`].

use crate::models::deployments::Stage;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Represents a project in the database.
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    AsChangeset,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    PartialEq,
    ToSchema,
)]
#[diesel(table_name = crate::schema::projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[schema(example = json!({
    "id": "123e4567-e89b-12d3-a456-426614174000",
    "created_at": "2025-01-01T00:00:00Z",
    "updated_at": "2025-01-01T00:00:00Z",
    "name": "portfolio",
    "description": "Personal site",
    "source_repo": "octo/portfolio",
    "stage_repo": "octo/portfolio-stage",
    "prod_repo": "octo/octo.github.io",
    "stage_branch": "main",
    "prod_branch": "main",
    "stage_url": "https://octo.github.io/portfolio-stage",
    "prod_url": "https://octo.github.io",
    "build_command": "npm run build",
    "build_output_dir": "dist",
    "github_workflow_file": "deploy.yml",
    "active": true
}))]
pub struct Project {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Display name, also used in commit messages.
    pub name: String,
    pub description: Option<String>,
    /// Repository that receives repository-dispatch events.
    pub source_repo: String,
    pub stage_repo: Option<String>,
    pub prod_repo: Option<String>,
    pub stage_branch: String,
    pub prod_branch: String,
    pub stage_url: Option<String>,
    pub prod_url: Option<String>,
    pub build_command: String,
    pub build_output_dir: String,
    pub github_workflow_file: String,
    pub active: bool,
}

/// Where a stage publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTarget<'a> {
    /// Target repository slug, `None` when unset or blank.
    pub repo: Option<&'a str>,
    pub branch: &'a str,
    pub url: Option<&'a str>,
}

impl Project {
    /// Resolves the repository, branch and URL configured for `stage`.
    pub fn target_for(&self, stage: Stage) -> StageTarget<'_> {
        let (repo, branch, url) = match stage {
            Stage::Stage => (&self.stage_repo, &self.stage_branch, &self.stage_url),
            Stage::Prod => (&self.prod_repo, &self.prod_branch, &self.prod_url),
        };
        StageTarget {
            repo: repo.as_deref().map(str::trim).filter(|r| !r.is_empty()),
            branch: branch.as_str(),
            url: url.as_deref().map(str::trim).filter(|u| !u.is_empty()),
        }
    }
}

/// Checks an `owner/name` repository slug.
pub fn validate_repo_slug(slug: &str) -> Result<(), String> {
    let mut parts = slug.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    ) && slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));

    if valid {
        Ok(())
    } else {
        Err(format!(
            "Invalid repository '{}': expected 'owner/name'",
            slug
        ))
    }
}

fn validate_optional_repo(slug: &Option<String>) -> Result<(), String> {
    match slug.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => validate_repo_slug(s),
        _ => Ok(()),
    }
}

/// Represents a new project to be inserted into the database.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::schema::projects)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source_repo: String,
    #[serde(default)]
    pub stage_repo: Option<String>,
    #[serde(default)]
    pub prod_repo: Option<String>,
    #[serde(default = "default_branch")]
    pub stage_branch: String,
    #[serde(default = "default_branch")]
    pub prod_branch: String,
    #[serde(default)]
    pub stage_url: Option<String>,
    #[serde(default)]
    pub prod_url: Option<String>,
    #[serde(default = "default_build_command")]
    pub build_command: String,
    #[serde(default = "default_build_output_dir")]
    pub build_output_dir: String,
    #[serde(default = "default_workflow_file")]
    pub github_workflow_file: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_build_command() -> String {
    "npm run build".to_string()
}

fn default_build_output_dir() -> String {
    "dist".to_string()
}

fn default_workflow_file() -> String {
    "deploy.yml".to_string()
}

fn default_active() -> bool {
    true
}

impl NewProject {
    /// Creates a project with default branches, build command and workflow file.
    pub fn new(
        name: String,
        source_repo: String,
        stage_repo: Option<String>,
        prod_repo: Option<String>,
    ) -> Result<Self, String> {
        let project = NewProject {
            name,
            description: None,
            source_repo,
            stage_repo,
            prod_repo,
            stage_branch: default_branch(),
            prod_branch: default_branch(),
            stage_url: None,
            prod_url: None,
            build_command: default_build_command(),
            build_output_dir: default_build_output_dir(),
            github_workflow_file: default_workflow_file(),
            active: true,
        };
        project.validate()?;
        Ok(project)
    }

    /// Validates a project received over the API.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Project name cannot be empty".to_string());
        }
        if self.name.len() > 255 {
            return Err("Project name cannot exceed 255 characters".to_string());
        }
        validate_repo_slug(self.source_repo.trim())?;
        validate_optional_repo(&self.stage_repo)?;
        validate_optional_repo(&self.prod_repo)?;
        if self.stage_branch.trim().is_empty() || self.prod_branch.trim().is_empty() {
            return Err("Branch names cannot be empty".to_string());
        }
        if self.build_output_dir.trim().is_empty() {
            return Err("Build output directory cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Partial update for a project. Absent fields are left unchanged.
#[derive(AsChangeset, Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::schema::projects)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_repo: Option<String>,
    pub stage_repo: Option<String>,
    pub prod_repo: Option<String>,
    pub stage_branch: Option<String>,
    pub prod_branch: Option<String>,
    pub stage_url: Option<String>,
    pub prod_url: Option<String>,
    pub build_command: Option<String>,
    pub build_output_dir: Option<String>,
    pub github_workflow_file: Option<String>,
    pub active: Option<bool>,
}

impl UpdateProject {
    /// True when no field is set; diesel refuses an empty changeset.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.source_repo.is_none()
            && self.stage_repo.is_none()
            && self.prod_repo.is_none()
            && self.stage_branch.is_none()
            && self.prod_branch.is_none()
            && self.stage_url.is_none()
            && self.prod_url.is_none()
            && self.build_command.is_none()
            && self.build_output_dir.is_none()
            && self.github_workflow_file.is_none()
            && self.active.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Project name cannot be empty".to_string());
            }
        }
        if let Some(source) = &self.source_repo {
            validate_repo_slug(source.trim())?;
        }
        validate_optional_repo(&self.stage_repo)?;
        validate_optional_repo(&self.prod_repo)?;
        Ok(())
    }
}
