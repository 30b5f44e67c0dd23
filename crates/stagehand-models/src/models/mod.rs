/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data models for the deployment orchestrator
pub mod changelog;
pub mod deployment_locks;
pub mod deployments;
pub mod projects;
pub mod runners;

pub use changelog::{ChangelogEntry, NewChangelogEntry};
pub use deployment_locks::{DeploymentLock, NewDeploymentLock};
pub use deployments::{Deployment, DeploymentStatus, NewDeployment, Stage, StatusChange};
pub use projects::{NewProject, Project, StageTarget, UpdateProject};
pub use runners::{NewRunner, Runner};
