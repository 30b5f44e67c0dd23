/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Test fixture for the Stagehand broker.
//!
//! Every [`TestFixture`] runs against its own freshly created database, so
//! tests that use it need `DATABASE_URL` pointing at a PostgreSQL server the
//! user may create databases on. The database is dropped with the fixture.

use axum::body::{to_bytes, Body};
use axum::extract::Path;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::MigrationHarness;
use dotenv::dotenv;
use stagehand_broker::api::{self, AppState};
use stagehand_broker::cli::commands::MIGRATIONS;
use stagehand_broker::dal::DAL;
use stagehand_broker::db::{create_shared_connection_pool, ConnectionPool};
use stagehand_broker::github::GitHubClient;
use stagehand_broker::orchestrator::OrchestratorConfig;
use stagehand_broker::utils::{self, pak};
use stagehand_models::models::deployments::{Deployment, NewDeployment, Stage};
use stagehand_models::models::projects::{NewProject, Project};
use stagehand_models::models::runners::{NewRunner, Runner};
use stagehand_models::schema::admin_role;
use stagehand_utils::config::{GitHub, Settings};
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

/// Initializes the shared PAK controller from the default settings.
pub fn init_pak_controller() {
    let settings = Settings::new(None).expect("Failed to load default settings");
    pak::create_pak_controller(Some(&settings)).expect("Failed to create PAK controller");
}

/// A recorded repository-dispatch call: target repo, headers and JSON body.
pub type Dispatch = (String, HeaderMap, serde_json::Value);

/// In-process stand-in for the GitHub dispatch endpoint.
pub struct MockGitHub {
    pub url: String,
    pub dispatches: Arc<Mutex<Vec<Dispatch>>>,
}

impl MockGitHub {
    /// Starts a server answering every dispatch with `status` and `body`.
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let dispatches: Arc<Mutex<Vec<Dispatch>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = dispatches.clone();
        let app = Router::new().route(
            "/repos/:owner/:repo/dispatches",
            post(
                move |Path((owner, repo)): Path<(String, String)>,
                      headers: HeaderMap,
                      Json(payload): Json<serde_json::Value>| {
                    let sink = sink.clone();
                    async move {
                        sink.lock()
                            .unwrap()
                            .push((format!("{}/{}", owner, repo), headers, payload));
                        (status, body)
                    }
                },
            ),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockGitHub {
            url: format!("http://{}", addr),
            dispatches,
        }
    }

    pub fn calls(&self) -> Vec<Dispatch> {
        self.dispatches.lock().unwrap().clone()
    }

    pub fn client(&self) -> GitHubClient {
        github_client(&self.url)
    }
}

pub fn github_client(api_url: &str) -> GitHubClient {
    GitHubClient::new(&GitHub {
        api_url: api_url.to_string(),
        token: "ghp_test".to_string(),
        user_agent: "stagehand-test".to_string(),
        api_version: "2022-11-28".to_string(),
        request_timeout_seconds: 5,
    })
    .unwrap()
}

/// Builds the full router with state applied.
pub fn router(state: AppState) -> Router {
    let settings = Settings::new(None).expect("Failed to load default settings");
    api::configure_api_routes(state.clone(), &settings.cors).with_state(state)
}

/// A router whose database is unreachable, for tests that never touch it.
pub fn offline_router() -> Router {
    let manager = ConnectionManager::<PgConnection>::new("postgres://nobody@127.0.0.1:1/stagehand");
    let pool = Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_millis(250))
        .build_unchecked(manager);
    let dal = DAL::new(ConnectionPool { pool, schema: None });

    router(AppState {
        dal,
        github: github_client("http://127.0.0.1:1"),
        orchestrator: OrchestratorConfig::default(),
    })
}

/// Sends a request through the router and returns the response.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    pak: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(pak) = pak {
        builder = builder.header("Authorization", format!("Bearer {}", pak));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Represents a test fixture backed by a private database.
pub struct TestFixture {
    pub dal: DAL,
    pub admin_pak: String,
    pub runner: Runner,
    pub runner_pak: String,
    database_name: String,
    server_url: String,
}

impl TestFixture {
    /// Creates a database, runs migrations and registers an admin and a runner.
    ///
    /// # Panics
    ///
    /// Panics if `DATABASE_URL` is unset or the server is unreachable.
    pub fn new() -> Self {
        dotenv().ok();
        init_pak_controller();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for integration tests");
        let mut server = Url::parse(&database_url).expect("Invalid DATABASE_URL");
        server.set_path("postgres");
        let server_url = server.to_string();

        let database_name = format!("stagehand_test_{}", Uuid::new_v4().simple());
        let mut admin_conn =
            PgConnection::establish(&server_url).expect("Failed to connect to server");
        sql_query(format!("CREATE DATABASE {}", database_name))
            .execute(&mut admin_conn)
            .expect("Failed to create test database");

        let pool = create_shared_connection_pool(&server_url, &database_name, 5, None);
        let mut conn = pool.get().expect("Failed to get DB connection");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations");

        let (admin_pak, admin_hash) = pak::create_pak().unwrap();
        diesel::insert_into(admin_role::table)
            .values(&utils::NewAdminKey {
                pak_hash: admin_hash,
            })
            .execute(&mut conn)
            .expect("Failed to insert admin role");
        drop(conn);

        let dal = DAL::new(pool);

        let runner = dal
            .runners()
            .create(&NewRunner::new("ci".to_string(), None).unwrap())
            .expect("Failed to create runner");
        let (runner_pak, runner_hash) = pak::create_pak().unwrap();
        let runner = dal
            .runners()
            .update_pak_hash(runner.id, runner_hash)
            .expect("Failed to set runner PAK");

        TestFixture {
            dal,
            admin_pak,
            runner,
            runner_pak,
            database_name,
            server_url,
        }
    }

    /// Router wired to this fixture's database and the given GitHub endpoint.
    pub fn router(&self, github: GitHubClient) -> Router {
        router(AppState {
            dal: self.dal.clone(),
            github,
            orchestrator: OrchestratorConfig::default(),
        })
    }

    /// Inserts a project with a stage target and, optionally, a prod target.
    pub fn insert_project(&self, prod_repo: Option<&str>) -> Project {
        let mut new_project = NewProject::new(
            format!("portfolio-{}", Uuid::new_v4().simple()),
            "octo/portfolio".to_string(),
            Some("octo/portfolio-stage".to_string()),
            prod_repo.map(String::from),
        )
        .expect("Failed to build NewProject");
        new_project.stage_url = Some("https://octo.github.io/portfolio-stage".to_string());

        self.dal
            .projects()
            .create(&new_project)
            .expect("Failed to create project")
    }

    pub fn insert_deployment(&self, project_id: Uuid, stage: Stage) -> Deployment {
        self.dal
            .deployments()
            .create(&NewDeployment::new(project_id, stage, None).unwrap())
            .expect("Failed to create deployment")
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.server_url) {
            let _ = sql_query(format!(
                "DROP DATABASE IF EXISTS {} WITH (FORCE)",
                self.database_name
            ))
            .execute(&mut conn);
        }
    }
}
