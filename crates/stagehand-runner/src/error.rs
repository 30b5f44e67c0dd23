/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Error type shared by every runner step.

use stagehand_broker::github::GitHubError;
use std::fmt;
use std::path::PathBuf;

/// Errors that abort a mirror deployment.
#[derive(Debug)]
pub enum RunnerError {
    /// A required input is missing or malformed.
    Config(String),
    /// The build output directory does not exist.
    MissingBuildOutput(PathBuf),
    /// A git command exited non-zero.
    Git { command: String, stderr: String },
    /// Filesystem work on the working tree failed.
    Io(std::io::Error),
    /// Repository creation on GitHub failed.
    GitHub(GitHubError),
    /// The broker could not be reached or rejected the request.
    Broker { status: Option<u16>, body: String },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Config(msg) => write!(f, "Invalid runner configuration: {}", msg),
            RunnerError::MissingBuildOutput(path) => {
                write!(f, "Build output directory {} does not exist", path.display())
            }
            RunnerError::Git { command, stderr } => {
                write!(f, "git {} failed: {}", command, stderr.trim())
            }
            RunnerError::Io(e) => write!(f, "Filesystem error: {}", e),
            RunnerError::GitHub(e) => write!(f, "{}", e),
            RunnerError::Broker {
                status: Some(status),
                body,
            } => write!(f, "Broker returned {}: {}", status, body),
            RunnerError::Broker { status: None, body } => {
                write!(f, "Broker request failed: {}", body)
            }
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<std::io::Error> for RunnerError {
    fn from(e: std::io::Error) -> Self {
        RunnerError::Io(e)
    }
}

impl From<GitHubError> for RunnerError {
    fn from(e: GitHubError) -> Self {
        RunnerError::GitHub(e)
    }
}

impl From<reqwest::Error> for RunnerError {
    fn from(e: reqwest::Error) -> Self {
        RunnerError::Broker {
            status: e.status().map(|s| s.as_u16()),
            body: e.to_string(),
        }
    }
}
