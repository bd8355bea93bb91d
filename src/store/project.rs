//! Project entity operations over a SQLite connection.
//!
//! All multi-row writes run inside one transaction: either every row persists
//! or none do.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::store::{NewProject, Project};

const SELECT_COLUMNS: &str =
    "project_id, project_name, description, project_key, created, updated, deleted";

fn map_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        project_id: row.get(0)?,
        project_name: row.get(1)?,
        description: row.get(2)?,
        project_key: row.get(3)?,
        created: row.get(4)?,
        updated: row.get(5)?,
        deleted: row.get(6)?,
    })
}

/// Insert projects, minting an id for any entry without one. Returns the
/// inserted rows. Duplicate ids violate the primary key and roll the whole
/// batch back.
pub fn insert_projects(conn: &mut Connection, projects: &[NewProject]) -> Result<Vec<Project>> {
    for p in projects {
        if p.name.trim().is_empty() {
            return Err(Error::MissingPayload(
                "project name must not be empty".into(),
            ));
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    let mut inserted = Vec::with_capacity(projects.len());
    for p in projects {
        let project = Project {
            project_id: p
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            project_name: p.name.clone(),
            description: p.description.clone(),
            project_key: p.key.clone(),
            created: now.clone(),
            updated: now.clone(),
            deleted: None,
        };
        tx.execute(
            "INSERT INTO project (project_id, project_name, description, project_key, created, updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.project_id,
                project.project_name,
                project.description,
                project.project_key,
                project.created,
                project.updated,
            ],
        )?;
        inserted.push(project);
    }

    tx.commit()?;
    Ok(inserted)
}

/// List projects, excluding soft-deleted rows unless asked for.
pub fn list_projects(conn: &Connection, include_deleted: bool) -> Result<Vec<Project>> {
    let sql = if include_deleted {
        format!("SELECT {SELECT_COLUMNS} FROM project ORDER BY project_name")
    } else {
        format!("SELECT {SELECT_COLUMNS} FROM project WHERE deleted IS NULL ORDER BY project_name")
    };

    let mut stmt = conn.prepare(&sql)?;
    let projects = stmt
        .query_map([], map_project)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(projects)
}

/// Soft-delete projects by id. Already-deleted and unknown ids are skipped;
/// returns the number of rows actually stamped.
pub fn soft_delete_projects(conn: &mut Connection, ids: &[String]) -> Result<u64> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    let mut stamped = 0u64;
    for id in ids {
        stamped += tx.execute(
            "UPDATE project SET deleted = ?1, updated = ?1 WHERE project_id = ?2 AND deleted IS NULL",
            params![now, id],
        )? as u64;
    }

    tx.commit()?;
    Ok(stamped)
}

/// Update a project's description and/or key. Fails NotFound when the id does
/// not match any non-deleted project.
pub fn annotate_project(
    conn: &mut Connection,
    id: &str,
    description: Option<&str>,
    key: Option<&str>,
) -> Result<Project> {
    if description.is_none() && key.is_none() {
        return Err(Error::MissingPayload(
            "annotate_project requires at least one of description or key".into(),
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    let rows = match (description, key) {
        (Some(d), Some(k)) => tx.execute(
            "UPDATE project SET description = ?1, project_key = ?2, updated = ?3 \
             WHERE project_id = ?4 AND deleted IS NULL",
            params![d, k, now, id],
        )?,
        (Some(d), None) => tx.execute(
            "UPDATE project SET description = ?1, updated = ?2 \
             WHERE project_id = ?3 AND deleted IS NULL",
            params![d, now, id],
        )?,
        (None, Some(k)) => tx.execute(
            "UPDATE project SET project_key = ?1, updated = ?2 \
             WHERE project_id = ?3 AND deleted IS NULL",
            params![k, now, id],
        )?,
        (None, None) => unreachable!("checked above"),
    };

    if rows == 0 {
        return Err(Error::NotFound(format!("project '{id}'")));
    }

    let project = tx
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM project WHERE project_id = ?1"),
            params![id],
            map_project,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("project '{id}'")))?;

    tx.commit()?;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn new_project(name: &str) -> NewProject {
        NewProject {
            id: None,
            name: name.into(),
            description: None,
            key: None,
        }
    }

    #[test]
    fn insert_mints_unique_ids() {
        let mut conn = test_conn();
        let inserted =
            insert_projects(&mut conn, &[new_project("alpha"), new_project("beta")]).unwrap();

        assert_eq!(inserted.len(), 2);
        assert_ne!(inserted[0].project_id, inserted[1].project_id);
        assert!(inserted.iter().all(|p| !p.project_id.is_empty()));
        assert!(inserted.iter().all(|p| p.deleted.is_none()));
    }

    #[test]
    fn empty_name_rejects_the_whole_batch() {
        let mut conn = test_conn();
        let result = insert_projects(&mut conn, &[new_project("ok"), new_project("  ")]);

        assert!(matches!(result, Err(Error::MissingPayload(_))));
        assert!(list_projects(&conn, true).unwrap().is_empty());
    }

    #[test]
    fn soft_delete_excludes_from_default_listing() {
        let mut conn = test_conn();
        let inserted = insert_projects(&mut conn, &[new_project("alpha")]).unwrap();
        let id = inserted[0].project_id.clone();

        let stamped = soft_delete_projects(&mut conn, &[id.clone()]).unwrap();
        assert_eq!(stamped, 1);

        assert!(list_projects(&conn, false).unwrap().is_empty());
        let all = list_projects(&conn, true).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].deleted.is_some());

        // a second delete is a no-op
        assert_eq!(soft_delete_projects(&mut conn, &[id]).unwrap(), 0);
    }

    #[test]
    fn annotate_updates_description_and_key() {
        let mut conn = test_conn();
        let inserted = insert_projects(&mut conn, &[new_project("alpha")]).unwrap();
        let id = inserted[0].project_id.clone();

        let project = annotate_project(&mut conn, &id, Some("client work"), Some("ALPHA")).unwrap();
        assert_eq!(project.description.as_deref(), Some("client work"));
        assert_eq!(project.project_key.as_deref(), Some("ALPHA"));

        // key-only annotation keeps the description
        let project = annotate_project(&mut conn, &id, None, Some("ALPHA-2")).unwrap();
        assert_eq!(project.description.as_deref(), Some("client work"));
        assert_eq!(project.project_key.as_deref(), Some("ALPHA-2"));
    }

    #[test]
    fn annotate_unknown_or_deleted_project_fails() {
        let mut conn = test_conn();
        let result = annotate_project(&mut conn, "no-such-id", Some("x"), None);
        assert!(matches!(result, Err(Error::NotFound(_))));

        let inserted = insert_projects(&mut conn, &[new_project("alpha")]).unwrap();
        let id = inserted[0].project_id.clone();
        soft_delete_projects(&mut conn, &[id.clone()]).unwrap();

        let result = annotate_project(&mut conn, &id, Some("x"), None);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn annotate_without_fields_is_a_payload_error() {
        let mut conn = test_conn();
        let result = annotate_project(&mut conn, "any", None, None);
        assert!(matches!(result, Err(Error::MissingPayload(_))));
    }
}
