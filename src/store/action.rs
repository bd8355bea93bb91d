//! Action entity operations over a SQLite connection.

use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::store::{Action, NewAction};

const SELECT_COLUMNS: &str = "action_id, action_name, description, created, updated, deleted";

fn map_action(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        action_id: row.get(0)?,
        action_name: row.get(1)?,
        description: row.get(2)?,
        created: row.get(3)?,
        updated: row.get(4)?,
        deleted: row.get(5)?,
    })
}

/// Insert actions, minting an id for any entry without one. Returns the
/// inserted rows.
pub fn insert_actions(conn: &mut Connection, actions: &[NewAction]) -> Result<Vec<Action>> {
    for a in actions {
        if a.name.trim().is_empty() {
            return Err(Error::MissingPayload("action name must not be empty".into()));
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    let mut inserted = Vec::with_capacity(actions.len());
    for a in actions {
        let action = Action {
            action_id: a
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            action_name: a.name.clone(),
            description: a.description.clone(),
            created: now.clone(),
            updated: now.clone(),
            deleted: None,
        };
        tx.execute(
            "INSERT INTO action (action_id, action_name, description, created, updated) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                action.action_id,
                action.action_name,
                action.description,
                action.created,
                action.updated,
            ],
        )?;
        inserted.push(action);
    }

    tx.commit()?;
    Ok(inserted)
}

/// List actions, excluding soft-deleted rows unless asked for.
pub fn list_actions(conn: &Connection, include_deleted: bool) -> Result<Vec<Action>> {
    let sql = if include_deleted {
        format!("SELECT {SELECT_COLUMNS} FROM action ORDER BY action_name")
    } else {
        format!("SELECT {SELECT_COLUMNS} FROM action WHERE deleted IS NULL ORDER BY action_name")
    };

    let mut stmt = conn.prepare(&sql)?;
    let actions = stmt
        .query_map([], map_action)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(actions)
}

/// Soft-delete actions by id; returns the number of rows actually stamped.
pub fn soft_delete_actions(conn: &mut Connection, ids: &[String]) -> Result<u64> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    let mut stamped = 0u64;
    for id in ids {
        stamped += tx.execute(
            "UPDATE action SET deleted = ?1, updated = ?1 WHERE action_id = ?2 AND deleted IS NULL",
            params![now, id],
        )? as u64;
    }

    tx.commit()?;
    Ok(stamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_action(name: &str) -> NewAction {
        NewAction {
            id: None,
            name: name.into(),
            description: None,
        }
    }

    #[test]
    fn insert_list_and_soft_delete() {
        let mut conn = db::open_memory_database().unwrap();

        let inserted =
            insert_actions(&mut conn, &[new_action("meeting"), new_action("review")]).unwrap();
        assert_eq!(inserted.len(), 2);

        let listed = list_actions(&conn, false).unwrap();
        assert_eq!(listed.len(), 2);
        // ordered by name
        assert_eq!(listed[0].action_name, "meeting");
        assert_eq!(listed[1].action_name, "review");

        let id = inserted[0].action_id.clone();
        assert_eq!(soft_delete_actions(&mut conn, &[id]).unwrap(), 1);
        assert_eq!(list_actions(&conn, false).unwrap().len(), 1);
        assert_eq!(list_actions(&conn, true).unwrap().len(), 2);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut conn = db::open_memory_database().unwrap();
        let result = insert_actions(&mut conn, &[new_action("")]);
        assert!(matches!(result, Err(Error::MissingPayload(_))));
    }
}
