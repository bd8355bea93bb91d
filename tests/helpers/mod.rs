#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tempo::backend::{SqliteBackend, StorageBackend};
use tempo::server::SharedBackend;
use tempo::store::{NewAction, NewProject, NewWorklog};

/// Fresh in-memory SQLite backend with schema applied.
pub fn test_backend() -> SqliteBackend {
    SqliteBackend::open_in_memory().unwrap()
}

/// The same backend wrapped the way the listener shares it.
pub fn shared_backend() -> SharedBackend {
    let backend: Box<dyn StorageBackend + Send> = Box::new(test_backend());
    Arc::new(Mutex::new(backend))
}

/// Insert one project and return its minted id.
pub fn seed_project(backend: &mut dyn StorageBackend, name: &str) -> String {
    backend
        .insert_projects(&[NewProject {
            id: None,
            name: name.into(),
            description: None,
            key: None,
        }])
        .unwrap()[0]
        .project_id
        .clone()
}

/// Insert one action and return its minted id.
pub fn seed_action(backend: &mut dyn StorageBackend, name: &str) -> String {
    backend
        .insert_actions(&[NewAction {
            id: None,
            name: name.into(),
            description: None,
        }])
        .unwrap()[0]
        .action_id
        .clone()
}

/// Append one worklog entry and return its id.
pub fn seed_worklog(
    backend: &mut dyn StorageBackend,
    project_id: &str,
    action_id: &str,
    timestamp: Option<&str>,
) -> i64 {
    backend
        .append_worklog(&NewWorklog {
            project_id: project_id.into(),
            action_id: action_id.into(),
            timestamp: timestamp.map(Into::into),
            ticket_key: None,
        })
        .unwrap()
        .worklog_id
}
