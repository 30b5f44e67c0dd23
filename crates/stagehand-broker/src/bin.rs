/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use stagehand_broker::cli::commands;
use stagehand_broker::cli::{parse_cli, Commands, CreateSubcommands, RotateSubcommands};
use stagehand_broker::utils;
use stagehand_utils::config::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_cli();

    let config = Settings::new(cli.config.clone())?;

    let telemetry_config = config.telemetry.for_broker();
    stagehand_utils::telemetry::init(&telemetry_config, &config.log.level, &config.log.format)?;

    utils::pak::create_pak_controller(Some(&config))?;

    match cli.command {
        Commands::Serve => commands::serve(&config).await?,
        Commands::Sweep => commands::sweep(&config)?,
        Commands::Create(create) => match create.command {
            CreateSubcommands::Project {
                name,
                source_repo,
                stage_repo,
                prod_repo,
                stage_url,
                prod_url,
            } => commands::create_project(
                &config,
                commands::ProjectArgs {
                    name,
                    source_repo,
                    stage_repo,
                    prod_repo,
                    stage_url,
                    prod_url,
                },
            )?,
            CreateSubcommands::Runner { name, description } => {
                commands::create_runner(&config, name, description)?
            }
        },
        Commands::Rotate(rotate) => match rotate.command {
            RotateSubcommands::Admin => commands::rotate_admin(&config)?,
            RotateSubcommands::Runner { uuid } => commands::rotate_runner_key(&config, uuid)?,
        },
    }

    Ok(())
}
