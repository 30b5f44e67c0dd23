/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod commands;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Stagehand Broker CLI
///
/// Serves the broker API, registers projects and runners, and rotates keys.
pub struct Cli {
    /// Optional configuration file layered over the defaults
    #[arg(long, global = true, env = "STAGEHAND_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Stagehand Broker server
    Serve,

    /// Fail stale deployments once and exit
    Sweep,

    /// Create new entities
    Create(CreateCommands),

    /// Rotate keys
    Rotate(RotateCommands),
}

#[derive(Args)]
pub struct CreateCommands {
    #[command(subcommand)]
    pub command: CreateSubcommands,
}

#[derive(Subcommand)]
pub enum CreateSubcommands {
    /// Register a project
    Project {
        /// Unique project name
        #[arg(long)]
        name: String,
        /// Repository that receives dispatch events (owner/name)
        #[arg(long)]
        source_repo: String,
        /// Repository published for the stage environment (owner/name)
        #[arg(long)]
        stage_repo: Option<String>,
        /// Repository published for production (owner/name)
        #[arg(long)]
        prod_repo: Option<String>,
        #[arg(long)]
        stage_url: Option<String>,
        #[arg(long)]
        prod_url: Option<String>,
    },

    /// Register a CI runner and print its initial PAK
    Runner {
        /// Name of the runner
        #[arg(long)]
        name: String,
        /// Optional description of the runner
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Args)]
pub struct RotateCommands {
    #[command(subcommand)]
    pub command: RotateSubcommands,
}

#[derive(Subcommand)]
pub enum RotateSubcommands {
    /// Rotate a runner key
    Runner {
        /// UUID of the runner
        #[arg(long)]
        uuid: Uuid,
    },

    /// Rotate the admin key
    Admin,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
