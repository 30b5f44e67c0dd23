/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::TestFixture;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use stagehand_broker::orchestrator;
use stagehand_models::models::deployment_locks::NewDeploymentLock;
use stagehand_models::models::deployments::{
    timeout_error_message, DeploymentStatus, Stage, StatusChange,
};
use stagehand_models::schema::deployments;
use uuid::Uuid;

fn backdate(fixture: &TestFixture, deployment_id: Uuid, minutes: i64) {
    let conn = &mut fixture.dal.pool.get().unwrap();
    diesel::update(deployments::table.filter(deployments::id.eq(deployment_id)))
        .set(deployments::created_at.eq(Utc::now() - Duration::minutes(minutes)))
        .execute(conn)
        .unwrap();
}

#[test]
fn test_approve_only_from_pending() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);

    let approved = fixture.dal.deployments().approve(deployment.id).unwrap();
    assert_eq!(approved.status, "approved");
    assert!(approved.approved_at.is_some());

    let again = fixture.dal.deployments().approve(deployment.id);
    assert!(matches!(again, Err(diesel::result::Error::NotFound)));
}

#[test]
fn test_terminal_deployment_is_immutable() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);
    let dal = fixture.dal.deployments();

    dal.approve(deployment.id).unwrap();
    let deployed = StatusChange::new(
        DeploymentStatus::Deployed,
        Some("https://octo.github.io/portfolio-stage".to_string()),
        Some("abc123".to_string()),
        None,
        None,
    )
    .unwrap();
    let updated = dal.apply_change(deployment.id, &deployed).unwrap();
    assert_eq!(updated.status, "deployed");
    assert!(updated.deployed_at.is_some());

    let late_failure = dal.apply_change(deployment.id, &StatusChange::failed("too late"));
    assert!(matches!(late_failure, Err(diesel::result::Error::NotFound)));
    assert_eq!(dal.get(deployment.id).unwrap().unwrap().status, "deployed");
}

#[test]
fn test_deployed_write_clears_error_message() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);
    let dal = fixture.dal.deployments();

    dal.approve(deployment.id).unwrap();
    let mut deployed = StatusChange::new(
        DeploymentStatus::Deployed,
        Some("https://octo.github.io/portfolio-stage".to_string()),
        Some("abc123".to_string()),
        None,
        Some("retried after a flaky push".to_string()),
    )
    .unwrap();
    deployed.error_message = Some("stale error text".to_string());

    let updated = dal.apply_change(deployment.id, &deployed).unwrap();
    assert_eq!(updated.status, "deployed");
    assert!(updated.deployed_at.is_some());
    assert_eq!(updated.error_message, None);
    assert_eq!(updated.notes.as_deref(), Some("retried after a flaky push"));
}

#[test]
fn test_sweep_fails_only_stale_open_deployments() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(Some("octo/octo.github.io"));
    let stale = fixture.insert_deployment(project.id, Stage::Stage);
    let fresh = fixture.insert_deployment(project.id, Stage::Prod);
    let finished = fixture.insert_deployment(project.id, Stage::Stage);

    fixture
        .dal
        .deployments()
        .apply_change(finished.id, &StatusChange::failed("build broke"))
        .unwrap();
    backdate(&fixture, stale.id, 31);
    backdate(&fixture, finished.id, 120);

    fixture
        .dal
        .deployment_locks()
        .acquire(
            &NewDeploymentLock::new(
                project.id,
                Stage::Stage,
                stale.id,
                Utc::now(),
                Duration::minutes(45),
            )
            .unwrap(),
        )
        .unwrap();

    let failed = orchestrator::sweep_stale(&fixture.dal, Duration::minutes(25)).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, stale.id);

    let stale = fixture.dal.deployments().get(stale.id).unwrap().unwrap();
    assert_eq!(stale.status, "failed");
    assert_eq!(
        stale.error_message.as_deref(),
        Some(timeout_error_message(25).as_str())
    );
    assert!(fixture.dal.deployment_locks().list().unwrap().is_empty());

    let fresh = fixture.dal.deployments().get(fresh.id).unwrap().unwrap();
    assert_eq!(fresh.status, "pending");
    let finished = fixture.dal.deployments().get(finished.id).unwrap().unwrap();
    assert_eq!(finished.error_message.as_deref(), Some("build broke"));

    let entries = fixture
        .dal
        .changelog()
        .list_filtered(None, Some(stale.id), None)
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "deployment.timed_out");
    assert_eq!(entries[0].actor_type, "system");

    // A second sweep finds nothing.
    assert!(orchestrator::sweep_stale(&fixture.dal, Duration::minutes(30))
        .unwrap()
        .is_empty());
}

#[test]
fn test_deleting_project_cascades_to_deployments() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let deployment = fixture.insert_deployment(project.id, Stage::Stage);

    assert_eq!(fixture.dal.projects().delete(project.id).unwrap(), 1);
    assert!(fixture.dal.deployments().get(deployment.id).unwrap().is_none());
}
