/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Mirror Deployment
//!
//! Replaces the contents of a target repository with a fresh build and pushes
//! a single commit.
//!
//! ```mermaid
//! flowchart TD
//!     A[Clone target] -->|ok| C[Checkout branch]
//!     A -->|fails| B[Init + create repo + add origin]
//!     B --> D[Clear worktree except .git]
//!     C --> D
//!     D --> E[Copy build output]
//!     E --> F{Anything staged?}
//!     F -->|no| G[Write .deployed-at]
//!     F -->|yes| H[Commit]
//!     G --> H
//!     H --> I[Push --set-upstream]
//! ```

use crate::error::RunnerError;
use crate::git::GitRepo;
use chrono::{DateTime, Utc};
use stagehand_broker::github::GitHubClient;
use stagehand_utils::logging::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// File written when the build produced no change, so a commit still exists.
pub const TIMESTAMP_FILE: &str = ".deployed-at";

/// Everything a single mirror run needs.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    /// `owner/name` of the target repository.
    pub target_repo: String,
    pub project_name: String,
    pub branch: String,
    /// Clone URL, possibly carrying credentials.
    pub remote: String,
    /// Credential to scrub from git output.
    pub secret: Option<String>,
    pub build_dir: PathBuf,
    /// Where the target working tree is checked out. Replaced on every run.
    pub worktree: PathBuf,
    pub author_name: String,
    pub author_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOutcome {
    pub commit_hash: String,
    /// False when the target repository had to be created.
    pub cloned: bool,
}

/// GitHub Pages address for `repo` (`owner/name`).
pub fn pages_url(repo: &str) -> Option<String> {
    let (owner, name) = repo.split_once('/')?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    let host = format!("{}.github.io", owner.to_lowercase());
    if name.eq_ignore_ascii_case(&host) {
        Some(format!("https://{}", host))
    } else {
        Some(format!("https://{}/{}", host, name))
    }
}

/// Removes every entry under `dir` except `.git`.
pub fn clear_worktree(dir: &Path) -> Result<(), RunnerError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<u64, RunnerError> {
    std::os::unix::fs::symlink(link, target)?;
    Ok(1)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<u64, RunnerError> {
    warn!("Skipping symlink {} -> {}", target.display(), link.display());
    Ok(0)
}

/// Recursively copies the contents of `src` into `dst`, skipping `.git`.
///
/// Symlinks are recreated as links, never followed.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64, RunnerError> {
    let mut copied = 0;
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            copied += copy_symlink(&fs::read_link(entry.path())?, &target)?;
        } else if file_type.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn commit_message(project_name: &str, at: DateTime<Utc>) -> String {
    format!("Deploy {} at {}", project_name, at.to_rfc3339())
}

async fn prepare_worktree(
    request: &MirrorRequest,
    github: &GitHubClient,
) -> Result<(GitRepo, bool), RunnerError> {
    if request.worktree.exists() {
        fs::remove_dir_all(&request.worktree)?;
    }
    let secret = request.secret.as_deref();

    match GitRepo::clone_from(&request.remote, &request.worktree, secret).await {
        Ok(repo) => {
            repo.checkout_branch(&request.branch).await?;
            Ok((repo, true))
        }
        Err(e) => {
            warn!(
                "Cloning {} failed, creating it instead: {}",
                request.target_repo, e
            );
            if request.worktree.exists() {
                fs::remove_dir_all(&request.worktree)?;
            }
            let repo = GitRepo::init(&request.worktree, &request.branch, secret).await?;
            github.create_repository(&request.target_repo).await?;
            repo.add_remote(&request.remote).await?;
            Ok((repo, false))
        }
    }
}

/// Runs the full mirror and returns the pushed commit.
pub async fn mirror(
    request: &MirrorRequest,
    github: &GitHubClient,
) -> Result<MirrorOutcome, RunnerError> {
    if !request.build_dir.is_dir() {
        return Err(RunnerError::MissingBuildOutput(request.build_dir.clone()));
    }

    let (repo, cloned) = prepare_worktree(request, github).await?;
    clear_worktree(repo.path())?;

    let copied = copy_tree(&request.build_dir, repo.path())?;
    info!(
        "Copied {} files from {} into {}",
        copied,
        request.build_dir.display(),
        request.target_repo
    );

    let now = Utc::now();
    repo.stage_all().await?;
    if !repo.has_staged_changes().await? {
        info!("Build is unchanged, writing {}", TIMESTAMP_FILE);
        fs::write(
            repo.path().join(TIMESTAMP_FILE),
            format!("{}\n", now.to_rfc3339()),
        )?;
        repo.stage_all().await?;
    }

    repo.commit(
        &commit_message(&request.project_name, now),
        &request.author_name,
        &request.author_email,
    )
    .await?;
    repo.push(&request.branch).await?;

    let commit_hash = repo.head_commit().await?;
    info!(
        "Pushed {} to {} ({})",
        commit_hash, request.target_repo, request.branch
    );
    Ok(MirrorOutcome {
        commit_hash,
        cloned,
    })
}
