//! Soft delete, prune, and truncate semantics across the backend surface.

mod helpers;

use helpers::{seed_action, seed_project, seed_worklog, test_backend};
use tempo::backend::StorageBackend;
use tempo::Error;

#[test]
fn soft_deleted_rows_survive_until_pruned() {
    let mut backend = test_backend();

    let keep = seed_project(&mut backend, "keep");
    let doomed = seed_project(&mut backend, "doomed");

    assert_eq!(backend.soft_delete_projects(&[doomed.clone()]).unwrap(), 1);

    // excluded from the default listing, still physically present
    let live: Vec<String> = backend
        .list_projects(false)
        .unwrap()
        .into_iter()
        .map(|p| p.project_id)
        .collect();
    assert_eq!(live, vec![keep.clone()]);

    let all = backend.list_projects(true).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all
        .iter()
        .any(|p| p.project_id == doomed && p.deleted.is_some()));

    // prune physically removes only the stamped row
    backend.prune_deleted().unwrap();
    let all = backend.list_projects(true).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].project_id, keep);
}

#[test]
fn prune_covers_every_soft_deleting_entity() {
    let mut backend = test_backend();

    let project = seed_project(&mut backend, "alpha");
    let action = seed_action(&mut backend, "meeting");
    backend.soft_delete_projects(&[project]).unwrap();
    backend.soft_delete_actions(&[action]).unwrap();

    backend.prune_deleted().unwrap();

    assert!(backend.list_projects(true).unwrap().is_empty());
    assert!(backend.list_actions(true).unwrap().is_empty());
}

#[test]
fn truncate_empties_every_table_but_keeps_the_schema() {
    let mut backend = test_backend();

    let project = seed_project(&mut backend, "alpha");
    let action = seed_action(&mut backend, "meeting");
    seed_worklog(&mut backend, &project, &action, None);

    backend.truncate().unwrap();

    assert!(backend.list_projects(true).unwrap().is_empty());
    assert!(backend.list_actions(true).unwrap().is_empty());
    assert!(matches!(
        backend.remove_last_worklog(),
        Err(Error::NotFound(_))
    ));

    // schema still in place: inserts keep working
    seed_project(&mut backend, "beta");
    assert_eq!(backend.list_projects(false).unwrap().len(), 1);
}

#[test]
fn drop_and_init_schema_are_idempotent() {
    let mut backend = test_backend();

    backend.drop_schema().unwrap();
    backend.drop_schema().unwrap();

    // with the schema gone, inserts fail as write errors
    let result = backend.list_projects(false);
    assert!(matches!(result, Err(Error::Write(_))));

    backend.init_schema().unwrap();
    backend.init_schema().unwrap();

    seed_project(&mut backend, "alpha");
    assert_eq!(backend.list_projects(false).unwrap().len(), 1);
}

#[test]
fn bulk_insert_is_atomic() {
    let mut backend = test_backend();

    let result = backend.insert_projects(&[
        tempo::store::NewProject {
            id: None,
            name: "valid".into(),
            description: None,
            key: None,
        },
        tempo::store::NewProject {
            id: None,
            name: "".into(),
            description: None,
            key: None,
        },
    ]);

    assert!(matches!(result, Err(Error::MissingPayload(_))));
    assert!(backend.list_projects(true).unwrap().is_empty());
}

#[test]
fn duplicate_supplied_id_rolls_the_whole_batch_back() {
    let mut backend = test_backend();
    let existing = seed_project(&mut backend, "alpha");

    let result = backend.insert_projects(&[
        tempo::store::NewProject {
            id: None,
            name: "fresh".into(),
            description: None,
            key: None,
        },
        tempo::store::NewProject {
            id: Some(existing),
            name: "collides".into(),
            description: None,
            key: None,
        },
    ]);

    assert!(matches!(result, Err(Error::Write(_))));
    // the valid first row must not have survived the failed batch
    assert_eq!(backend.list_projects(true).unwrap().len(), 1);
}
