/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

/// Command-line interface module for the Stagehand runner.
pub mod commands;
use clap::{Args, Parser, Subcommand};
use stagehand_models::models::deployments::DeploymentStatus;
use std::path::PathBuf;
use uuid::Uuid;

/// CLI configuration structure.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional configuration file layered over the defaults
    #[arg(long, global = true, env = "STAGEHAND_CONFIG")]
    pub config: Option<String>,

    /// Broker base URL
    #[arg(long, global = true, env = "STAGEHAND_BROKER_URL")]
    pub broker_url: Option<String>,

    /// Runner PAK used to authenticate with the broker
    #[arg(long, global = true, env = "STAGEHAND_SERVICE_KEY", hide_env_values = true)]
    pub service_key: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror the build output into the target repository and report the result
    Deploy(DeployArgs),
    /// Report a deployment status without deploying
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[arg(long, env = "DEPLOYMENT_ID")]
    pub deployment_id: Uuid,

    /// Target repository as owner/name
    #[arg(long, env = "TARGET_REPO")]
    pub target_repo: String,

    #[arg(long, env = "PROJECT_NAME")]
    pub project_name: String,

    /// Source checkout the build ran in
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Build output directory, relative to the workspace
    #[arg(long, env = "BUILD_DIR")]
    pub build_dir: Option<String>,

    /// Token used for cloning, pushing and repository creation
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Where the target working tree is checked out
    #[arg(long)]
    pub worktree: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, env = "DEPLOYMENT_ID")]
    pub deployment_id: Uuid,

    /// One of pending, approved, deployed, failed
    #[arg(long, value_parser = parse_status)]
    pub status: DeploymentStatus,

    #[arg(long)]
    pub deployment_url: Option<String>,

    #[arg(long)]
    pub commit_hash: Option<String>,

    #[arg(long)]
    pub error_message: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

fn parse_status(value: &str) -> Result<DeploymentStatus, String> {
    value.parse()
}

/// Parses command-line arguments into the Cli structure.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
