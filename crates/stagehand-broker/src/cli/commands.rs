/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api;
use crate::dal::DAL;
use crate::db::{create_shared_connection_pool, ConnectionPool};
use crate::github::GitHubClient;
use crate::metrics;
use crate::orchestrator::{self, OrchestratorConfig};
use crate::utils;
use crate::utils::pak;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_query;
use diesel::sql_types::BigInt;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use stagehand_models::models::projects::NewProject;
use stagehand_models::models::runners::NewRunner;
use stagehand_utils::config::Settings;
use stagehand_utils::logging::prelude::*;
use tokio::signal;
use url::Url;
use uuid::Uuid;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../stagehand-models/migrations");

const DEFAULT_DATABASE_NAME: &str = "stagehand";

// Struct to hold the count result from SQL query
#[derive(QueryableByName, Debug)]
struct Count {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Arguments for `create project`.
#[derive(Debug, Clone)]
pub struct ProjectArgs {
    pub name: String,
    pub source_repo: String,
    pub stage_repo: Option<String>,
    pub prod_repo: Option<String>,
    pub stage_url: Option<String>,
    pub prod_url: Option<String>,
}

/// Database named in the URL path, or `stagehand` when the URL names none.
pub fn database_name(database_url: &str) -> String {
    Url::parse(database_url)
        .ok()
        .map(|url| url.path().trim_start_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string())
}

fn connect(config: &Settings, max_size: u32) -> ConnectionPool {
    create_shared_connection_pool(
        &config.database.url,
        &database_name(&config.database.url),
        max_size,
        config.database.schema.as_deref(),
    )
}

/// Function to start the Stagehand Broker server
///
/// This function initializes the database, runs migrations, checks for first-time setup,
/// starts the timeout sweeper, configures API routes, and starts the server with
/// graceful shutdown support.
pub async fn serve(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Stagehand Broker application");

    info!("Creating database connection pool");
    let connection_pool = connect(config, 5);
    info!("Database connection pool created successfully");

    if let Some(ref schema) = config.database.schema {
        info!("Setting up schema: {}", schema);
        connection_pool
            .setup_schema(schema)
            .expect("Failed to set up schema");
        info!("Schema '{}' set up successfully", schema);
    }

    info!("Running pending database migrations");
    let mut conn = connection_pool.get().expect("Failed to get DB connection");

    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
    info!("Database migrations completed successfully");

    let is_first_run = conn
        .transaction(|conn| {
            let result: Count =
                sql_query("SELECT COUNT(*) as count FROM app_initialization").get_result(conn)?;
            if result.count == 0 {
                sql_query("INSERT INTO app_initialization DEFAULT VALUES").execute(conn)?;
                Ok::<bool, DieselError>(true)
            } else {
                Ok::<bool, DieselError>(false)
            }
        })
        .expect("Failed to check initialization status");

    if is_first_run {
        info!("First time application startup detected. Creating admin role...");
        utils::first_startup(&mut conn, config)?;
    } else {
        info!("Existing application detected. Proceeding with normal startup.");
    }
    drop(conn);

    info!("Initializing Data Access Layer");
    let dal = DAL::new(connection_pool.clone());

    metrics::init();

    info!("Starting background tasks");
    let sweep_config = utils::background_tasks::TimeoutSweepConfig::from_settings(&config.broker);
    utils::background_tasks::start_timeout_sweep_task(dal.clone(), sweep_config);

    if config.github.token.is_empty() {
        warn!("No GitHub token configured; repository dispatch will be rejected upstream");
    }
    let github = GitHubClient::new(&config.github)?;

    let state = api::AppState {
        dal,
        github,
        orchestrator: OrchestratorConfig::from_settings(&config.broker),
    };

    info!("Configuring API routes");
    let app = api::configure_api_routes(state.clone(), &config.cors).with_state(state);

    let addr = config.broker.listen_address.as_str();
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        shutdown_tx.send(()).ok();
    });

    info!("Stagehand Broker is now running");
    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown(shutdown_rx))
        .await?;

    Ok(())
}

/// Runs one timeout sweep against the database and exits.
pub fn sweep(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let dal = DAL::new(connect(config, 1));
    let timeout = chrono::Duration::minutes(config.broker.deployment_timeout_minutes);

    let failed = orchestrator::sweep_stale(&dal, timeout)?;
    info!("Sweep complete, {} deployments timed out", failed.len());
    println!("Timed out {} deployments", failed.len());
    for deployment in failed {
        println!("{}", deployment.id);
    }
    Ok(())
}

/// Function to rotate the admin key
///
/// Generates a new admin PAK (or applies `broker.pak_hash`) and stores its hash.
pub fn rotate_admin(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Rotating admin key");

    let pool = connect(config, 1);
    let mut conn = pool.get()?;

    match utils::upsert_admin(&mut conn, config)? {
        Some(pak) => println!("New admin PAK: {}", pak),
        None => println!("Admin PAK hash updated from configuration"),
    }

    info!("Admin key rotated successfully");
    Ok(())
}

pub fn rotate_runner_key(config: &Settings, uuid: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    info!("Rotating runner key");

    let dal = DAL::new(connect(config, 1));

    let runner = dal.runners().get(uuid)?.ok_or("Runner not found")?;
    let (pak, pak_hash) = pak::create_pak()?;
    dal.runners().update_pak_hash(runner.id, pak_hash)?;

    info!("Runner key rotated successfully for runner: {}", runner.name);
    println!("New PAK for runner {}: {}", runner.name, pak);
    Ok(())
}

pub fn create_project(config: &Settings, args: ProjectArgs) -> Result<(), Box<dyn std::error::Error>> {
    info!("Creating new project: {}", args.name);

    let dal = DAL::new(connect(config, 1));

    let mut new_project = NewProject::new(args.name, args.source_repo, args.stage_repo, args.prod_repo)
        .map_err(|e| format!("Failed to create NewProject: {}", e))?;
    new_project.stage_url = args.stage_url;
    new_project.prod_url = args.prod_url;

    let project = dal.projects().create(&new_project)?;

    info!("Successfully created project with ID: {}", project.id);
    println!("Project created successfully:");
    println!("ID: {}", project.id);
    println!("Name: {}", project.name);
    println!("Source: {}", project.source_repo);
    Ok(())
}

pub fn create_runner(
    config: &Settings,
    name: String,
    description: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Creating new runner: {}", name);

    let dal = DAL::new(connect(config, 1));

    let new_runner = NewRunner::new(name, description)
        .map_err(|e| format!("Failed to create NewRunner: {}", e))?;

    let (pak, pak_hash) = pak::create_pak()?;

    let runner = dal.runners().create(&new_runner)?;
    dal.runners().update_pak_hash(runner.id, pak_hash)?;

    info!("Successfully created runner with ID: {}", runner.id);
    println!("Runner created successfully:");
    println!("ID: {}", runner.id);
    println!("Name: {}", runner.name);
    println!("Initial PAK: {}", pak);

    Ok(())
}
