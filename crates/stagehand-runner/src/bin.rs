/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use stagehand_runner::broker::BrokerEndpoint;
use stagehand_runner::cli::commands;
use stagehand_runner::cli::{parse_cli, Commands};
use stagehand_utils::config::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_cli();

    let mut config = Settings::new(cli.config.clone())?;
    if let Some(broker_url) = cli.broker_url {
        config.runner.broker_url = broker_url;
    }
    if let Some(service_key) = cli.service_key {
        config.runner.service_key = service_key;
    }

    let telemetry_config = config.telemetry.for_runner();
    stagehand_utils::telemetry::init(&telemetry_config, &config.log.level, &config.log.format)?;

    let endpoint = BrokerEndpoint::new(&config.runner.broker_url, &config.runner.service_key)?;

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy(&config, &endpoint, args).await,
        Commands::Report(args) => commands::report(&config, &endpoint, args).await,
    };

    stagehand_utils::telemetry::shutdown();
    result
}
