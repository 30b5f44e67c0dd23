/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Data Access Layer
//!
//! Every table the broker touches has a small accessor struct borrowed from
//! [`DAL`]. Accessors check a connection out of the shared pool per call and
//! return `diesel::result::Error` so callers decide how to surface failures.
//!
//! ```rust,ignore
//! let dal = DAL::new(pool);
//! let project = dal.projects().get(project_id)?;
//! let deployments = dal.deployments().list_filtered(Some(project_id), None, None)?;
//! ```

use crate::db::ConnectionPool;

mod changelog;
mod deployment_locks;
mod deployments;
mod projects;
mod runners;

pub use changelog::{ChangelogDAL, DEFAULT_CHANGELOG_LIMIT};
pub use deployment_locks::{DeploymentLocksDAL, LockAcquisition};
pub use deployments::DeploymentsDAL;
pub use projects::ProjectsDAL;
pub use runners::RunnersDAL;

/// The main Data Access Layer struct.
#[derive(Clone)]
pub struct DAL {
    /// A connection pool for PostgreSQL database connections.
    pub pool: ConnectionPool,
}

impl DAL {
    /// Creates a new DAL instance with the given connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        DAL { pool }
    }

    /// Provides access to the Projects Data Access Layer.
    pub fn projects(&self) -> ProjectsDAL {
        ProjectsDAL { dal: self }
    }

    /// Provides access to the Deployments Data Access Layer.
    pub fn deployments(&self) -> DeploymentsDAL {
        DeploymentsDAL { dal: self }
    }

    /// Provides access to the per-target deployment locks.
    pub fn deployment_locks(&self) -> DeploymentLocksDAL {
        DeploymentLocksDAL { dal: self }
    }

    /// Provides access to the changelog.
    pub fn changelog(&self) -> ChangelogDAL {
        ChangelogDAL { dal: self }
    }

    /// Provides access to the Runners Data Access Layer.
    pub fn runners(&self) -> RunnersDAL {
        RunnersDAL { dal: self }
    }
}
