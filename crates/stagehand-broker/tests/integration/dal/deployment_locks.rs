/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::TestFixture;
use chrono::{Duration, Utc};
use stagehand_broker::dal::LockAcquisition;
use stagehand_models::models::deployment_locks::NewDeploymentLock;
use stagehand_models::models::deployments::{Stage, StatusChange};
use uuid::Uuid;

fn lock_for(project_id: Uuid, deployment_id: Uuid, ttl: Duration) -> NewDeploymentLock {
    NewDeploymentLock::new(project_id, Stage::Stage, deployment_id, Utc::now(), ttl).unwrap()
}

#[test]
fn test_lock_is_exclusive_per_target() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(Some("octo/octo.github.io"));
    let first = fixture.insert_deployment(project.id, Stage::Stage);
    let second = fixture.insert_deployment(project.id, Stage::Stage);
    let locks = fixture.dal.deployment_locks();

    let acquired = locks
        .acquire(&lock_for(project.id, first.id, Duration::minutes(45)))
        .unwrap();
    assert!(matches!(acquired, LockAcquisition::Acquired(ref l) if l.deployment_id == first.id));

    // Same holder re-enters.
    let again = locks
        .acquire(&lock_for(project.id, first.id, Duration::minutes(45)))
        .unwrap();
    assert!(matches!(again, LockAcquisition::Acquired(_)));

    let blocked = locks
        .acquire(&lock_for(project.id, second.id, Duration::minutes(45)))
        .unwrap();
    assert!(matches!(blocked, LockAcquisition::Held(ref l) if l.deployment_id == first.id));

    let prod = fixture.insert_deployment(project.id, Stage::Prod);
    let prod_lock =
        NewDeploymentLock::new(project.id, Stage::Prod, prod.id, Utc::now(), Duration::minutes(45))
            .unwrap();
    assert!(matches!(
        locks.acquire(&prod_lock).unwrap(),
        LockAcquisition::Acquired(_)
    ));
    assert_eq!(locks.list().unwrap().len(), 2);
}

#[test]
fn test_expired_lock_is_reclaimed() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let stuck = fixture.insert_deployment(project.id, Stage::Stage);
    let next = fixture.insert_deployment(project.id, Stage::Stage);
    let locks = fixture.dal.deployment_locks();

    let mut expired = lock_for(project.id, stuck.id, Duration::minutes(45));
    expired.acquired_at = Utc::now() - Duration::hours(2);
    expired.expires_at = Utc::now() - Duration::hours(1);
    locks.acquire(&expired).unwrap();

    let taken = locks
        .acquire(&lock_for(project.id, next.id, Duration::minutes(45)))
        .unwrap();
    assert!(matches!(taken, LockAcquisition::Acquired(ref l) if l.deployment_id == next.id));
}

#[test]
fn test_lock_of_finished_deployment_is_reclaimed() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let done = fixture.insert_deployment(project.id, Stage::Stage);
    let next = fixture.insert_deployment(project.id, Stage::Stage);
    let locks = fixture.dal.deployment_locks();

    locks
        .acquire(&lock_for(project.id, done.id, Duration::minutes(45)))
        .unwrap();
    fixture
        .dal
        .deployments()
        .apply_change(done.id, &StatusChange::failed("build broke"))
        .unwrap();

    let taken = locks
        .acquire(&lock_for(project.id, next.id, Duration::minutes(45)))
        .unwrap();
    assert!(matches!(taken, LockAcquisition::Acquired(ref l) if l.deployment_id == next.id));
}

#[test]
fn test_release_removes_only_holders_lock() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);
    let holder = fixture.insert_deployment(project.id, Stage::Stage);
    let locks = fixture.dal.deployment_locks();

    locks
        .acquire(&lock_for(project.id, holder.id, Duration::minutes(45)))
        .unwrap();

    assert_eq!(locks.release(Uuid::new_v4()).unwrap(), 0);
    assert_eq!(locks.release(holder.id).unwrap(), 1);
    assert!(locks
        .get_for_target(project.id, Stage::Stage.as_str())
        .unwrap()
        .is_none());
}
