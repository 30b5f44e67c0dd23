/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Git Module
//!
//! Drives the `git` binary for the target repository working tree.
//!
//! Every command runs non-interactively (`GIT_TERMINAL_PROMPT=0`) and any
//! credential embedded in the remote URL is scrubbed from captured output
//! before it reaches logs or error messages.

use crate::error::RunnerError;
use stagehand_utils::logging::prelude::*;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use url::Url;

const REDACTED: &str = "***";

/// Builds the clone URL for `repo` (`owner/name`) under `base`.
///
/// HTTP(S) bases get the token embedded as `x-access-token` credentials.
/// Anything else is treated as a local directory of bare repositories.
pub fn remote_url(base: &str, repo: &str, token: &str) -> Result<String, RunnerError> {
    let raw = format!("{}/{}.git", base.trim_end_matches('/'), repo);

    match Url::parse(&raw) {
        Ok(mut url) if url.scheme() == "http" || url.scheme() == "https" => {
            if !token.is_empty() {
                url.set_username("x-access-token")
                    .and_then(|_| url.set_password(Some(token)))
                    .map_err(|_| {
                        RunnerError::Config(format!("Cannot add credentials to {}", base))
                    })?;
            }
            Ok(url.to_string())
        }
        _ => Ok(raw),
    }
}

fn scrub(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => text.replace(secret, REDACTED),
        _ => text.to_string(),
    }
}

async fn git(
    cwd: Option<&Path>,
    args: &[&str],
    secret: Option<&str>,
) -> Result<std::process::Output, RunnerError> {
    let mut command = Command::new("git");
    if let Some(cwd) = cwd {
        command.arg("-C").arg(cwd);
    }
    command.args(args).env("GIT_TERMINAL_PROMPT", "0");

    debug!("Running git {}", scrub(&args.join(" "), secret));
    Ok(command.output().await?)
}

async fn git_checked(
    cwd: Option<&Path>,
    args: &[&str],
    secret: Option<&str>,
) -> Result<String, RunnerError> {
    let output = git(cwd, args, secret).await?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let command = scrub(&args.join(" "), secret);
        let stderr = scrub(&String::from_utf8_lossy(&output.stderr), secret);
        warn!("git {} exited with {}", command, output.status);
        Err(RunnerError::Git { command, stderr })
    }
}

/// A local working tree with an `origin` remote.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    secret: Option<String>,
}

impl GitRepo {
    /// Clones `remote` into `dest`.
    pub async fn clone_from(
        remote: &str,
        dest: &Path,
        secret: Option<&str>,
    ) -> Result<Self, RunnerError> {
        let dest_str = dest.to_string_lossy().to_string();
        git_checked(None, &["clone", remote, dest_str.as_str()], secret).await?;
        Ok(GitRepo {
            path: dest.to_path_buf(),
            secret: secret.map(String::from),
        })
    }

    /// Initializes an empty repository at `dest` with HEAD on `branch`.
    pub async fn init(dest: &Path, branch: &str, secret: Option<&str>) -> Result<Self, RunnerError> {
        std::fs::create_dir_all(dest)?;
        let repo = GitRepo {
            path: dest.to_path_buf(),
            secret: secret.map(String::from),
        };
        repo.run(&["init"]).await?;
        repo.point_head_at(branch).await?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run(&self, args: &[&str]) -> Result<String, RunnerError> {
        git_checked(Some(&self.path), args, self.secret.as_deref()).await
    }

    async fn succeeds(&self, args: &[&str]) -> Result<bool, RunnerError> {
        Ok(git(Some(&self.path), args, self.secret.as_deref())
            .await?
            .status
            .success())
    }

    pub async fn add_remote(&self, remote: &str) -> Result<(), RunnerError> {
        self.run(&["remote", "add", "origin", remote]).await?;
        Ok(())
    }

    async fn point_head_at(&self, branch: &str) -> Result<(), RunnerError> {
        let reference = format!("refs/heads/{}", branch);
        self.run(&["symbolic-ref", "HEAD", reference.as_str()]).await?;
        Ok(())
    }

    async fn ref_exists(&self, reference: &str) -> Result<bool, RunnerError> {
        self.succeeds(&["rev-parse", "--verify", "--quiet", reference])
            .await
    }

    /// Puts the working tree on `branch`.
    ///
    /// Tracks `origin/<branch>` when the remote has it. Otherwise the branch
    /// starts from the current HEAD, or stays unborn in an empty clone.
    pub async fn checkout_branch(&self, branch: &str) -> Result<(), RunnerError> {
        let upstream = format!("origin/{}", branch);
        if self
            .ref_exists(&format!("refs/remotes/{}", upstream))
            .await?
        {
            self.run(&["checkout", "-B", branch, upstream.as_str()]).await?;
        } else if self.ref_exists("HEAD").await? {
            self.run(&["checkout", "-B", branch]).await?;
        } else {
            self.point_head_at(branch).await?;
        }
        Ok(())
    }

    pub async fn stage_all(&self) -> Result<(), RunnerError> {
        self.run(&["add", "-A"]).await?;
        Ok(())
    }

    /// True when the index differs from HEAD.
    pub async fn has_staged_changes(&self) -> Result<bool, RunnerError> {
        let status = self.run(&["status", "--porcelain"]).await?;
        Ok(!status.is_empty())
    }

    pub async fn commit(
        &self,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<(), RunnerError> {
        let name = format!("user.name={}", author_name);
        let email = format!("user.email={}", author_email);
        self.run(&["-c", name.as_str(), "-c", email.as_str(), "commit", "-m", message])
            .await?;
        Ok(())
    }

    /// Pushes without force; a diverged remote rejects the push.
    pub async fn push(&self, branch: &str) -> Result<(), RunnerError> {
        self.run(&["push", "--set-upstream", "origin", branch])
            .await?;
        Ok(())
    }

    pub async fn head_commit(&self) -> Result<String, RunnerError> {
        self.run(&["rev-parse", "HEAD"]).await
    }
}
