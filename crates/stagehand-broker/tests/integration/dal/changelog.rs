/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::TestFixture;
use stagehand_models::models::changelog::{
    NewChangelogEntry, ACTION_PROJECT_CREATED, ACTION_PROJECT_UPDATED, ACTOR_TYPE_ADMIN,
};
use uuid::Uuid;

#[test]
fn test_list_filters_and_limits() {
    let fixture = TestFixture::new();
    let changelog = fixture.dal.changelog();
    let project_a = Uuid::new_v4();
    let project_b = Uuid::new_v4();

    for i in 0..3 {
        let entry = NewChangelogEntry::new(ACTION_PROJECT_UPDATED, ACTOR_TYPE_ADMIN, format!("a{}", i))
            .unwrap()
            .for_project(project_a);
        changelog.create(&entry).unwrap();
    }
    let entry = NewChangelogEntry::new(ACTION_PROJECT_CREATED, ACTOR_TYPE_ADMIN, "b")
        .unwrap()
        .for_project(project_b)
        .with_details(serde_json::json!({"source_repo": "octo/b"}));
    let created = changelog.create(&entry).unwrap();
    assert_eq!(created.details.unwrap()["source_repo"], "octo/b");

    assert_eq!(changelog.list_filtered(None, None, None).unwrap().len(), 4);
    assert_eq!(
        changelog
            .list_filtered(Some(project_a), None, None)
            .unwrap()
            .len(),
        3
    );

    let newest = changelog.list_filtered(Some(project_a), None, Some(1)).unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].message, "a2");
}
