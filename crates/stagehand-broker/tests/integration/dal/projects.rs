/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::TestFixture;
use stagehand_models::models::projects::UpdateProject;

#[test]
fn test_create_get_and_update_project() {
    let fixture = TestFixture::new();
    let project = fixture.insert_project(None);

    let by_name = fixture
        .dal
        .projects()
        .get_by_name(&project.name)
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, project.id);

    let changes = UpdateProject {
        prod_repo: Some("octo/octo.github.io".to_string()),
        ..Default::default()
    };
    let updated = fixture.dal.projects().update(project.id, &changes).unwrap();
    assert_eq!(updated.prod_repo.as_deref(), Some("octo/octo.github.io"));
    assert_eq!(updated.stage_repo, project.stage_repo);
    assert!(updated.updated_at >= project.updated_at);
}

#[test]
fn test_list_projects() {
    let fixture = TestFixture::new();
    fixture.insert_project(None);
    fixture.insert_project(None);

    assert_eq!(fixture.dal.projects().list().unwrap().len(), 2);
}
