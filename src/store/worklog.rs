//! Worklog operations over a SQLite connection.
//!
//! The worklog is append-only. The only mutable entry is the most recent one
//! (maximum `worklog_id`): it can be amended by a signed duration or removed,
//! and removal is physical. Both paths run inside one transaction, so two
//! racing removals cannot both succeed against the same row.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::store::{NewWorklog, Worklog};

const SELECT_COLUMNS: &str = "worklog_id, project_id, action_id, timestamp, ticket_key";

fn map_worklog(row: &Row<'_>) -> rusqlite::Result<Worklog> {
    Ok(Worklog {
        worklog_id: row.get(0)?,
        project_id: row.get(1)?,
        action_id: row.get(2)?,
        timestamp: row.get(3)?,
        ticket_key: row.get(4)?,
    })
}

/// Resolve the timestamp for a new entry: validate a supplied one, default to
/// now. Shared by every storage backend.
pub fn resolve_timestamp(entry: &NewWorklog) -> Result<String> {
    match &entry.timestamp {
        Some(ts) => {
            DateTime::parse_from_rfc3339(ts)
                .map_err(|e| Error::Parse(format!("invalid timestamp {ts:?}: {e}")))?;
            Ok(ts.clone())
        }
        None => Ok(Utc::now().to_rfc3339()),
    }
}

/// Append one worklog entry. Fails with a WriteError when the referenced
/// project or action does not exist (foreign key).
pub fn append_worklog(conn: &mut Connection, entry: &NewWorklog) -> Result<Worklog> {
    let timestamp = resolve_timestamp(entry)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO worklog (project_id, action_id, timestamp, ticket_key) \
         VALUES (?1, ?2, ?3, ?4)",
        params![entry.project_id, entry.action_id, timestamp, entry.ticket_key],
    )?;
    let worklog_id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(Worklog {
        worklog_id,
        project_id: entry.project_id.clone(),
        action_id: entry.action_id.clone(),
        timestamp,
        ticket_key: entry.ticket_key.clone(),
    })
}

/// The entry with the maximum insertion sequence, or `None` on an empty log.
pub fn last_worklog(conn: &Connection) -> Result<Option<Worklog>> {
    let last = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM worklog ORDER BY worklog_id DESC LIMIT 1"),
            [],
            map_worklog,
        )
        .optional()?;
    Ok(last)
}

/// Overwrite one entry's timestamp. Fails NotFound when the id is gone.
pub fn update_worklog_timestamp(conn: &Connection, id: i64, timestamp: &str) -> Result<()> {
    let rows = conn.execute(
        "UPDATE worklog SET timestamp = ?1 WHERE worklog_id = ?2",
        params![timestamp, id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(format!("worklog entry {id}")));
    }
    Ok(())
}

/// Physically delete one entry. Fails NotFound when the id is gone.
pub fn delete_worklog(conn: &Connection, id: i64) -> Result<()> {
    let rows = conn.execute("DELETE FROM worklog WHERE worklog_id = ?1", params![id])?;
    if rows == 0 {
        return Err(Error::NotFound(format!("worklog entry {id}")));
    }
    Ok(())
}

/// Shift the last entry's timestamp by a signed duration. The fetch and the
/// update share one transaction.
pub fn modify_last_worklog(conn: &mut Connection, delta: Duration) -> Result<String> {
    let tx = conn.transaction()?;

    let Some(last) = last_worklog(&tx)? else {
        return Err(Error::NotFound("worklog is empty".into()));
    };

    let old = DateTime::parse_from_rfc3339(&last.timestamp).map_err(|e| {
        Error::Write(format!(
            "stored timestamp {:?} is not RFC 3339: {e}",
            last.timestamp
        ))
    })?;
    let new = (old + delta).to_rfc3339();

    update_worklog_timestamp(&tx, last.worklog_id, &new)?;
    tx.commit()?;

    Ok(format!(
        "Modified last worklog: {} → {}",
        last.timestamp, new
    ))
}

/// Physically remove the last entry. The fetch and the delete share one
/// transaction.
pub fn remove_last_worklog(conn: &mut Connection) -> Result<String> {
    let tx = conn.transaction()?;

    let Some(last) = last_worklog(&tx)? else {
        return Err(Error::NotFound("worklog is empty".into()));
    };

    delete_worklog(&tx, last.worklog_id)?;
    tx.commit()?;

    Ok("Removed last worklog".to_string())
}
