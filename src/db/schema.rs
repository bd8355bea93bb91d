//! SQL DDL for the tempo tables.
//!
//! Defines `project`, `action`, and `worklog`. Projects and actions carry a
//! nullable `deleted` timestamp (soft delete); worklog rows are append-only and
//! keyed by a monotonic `worklog_id`. All DDL uses `IF NOT EXISTS` /
//! `IF EXISTS` for idempotent initialization and teardown.

use rusqlite::Connection;

/// Tables that support soft delete, serviced uniformly by prune.
pub const SOFT_DELETE_TABLES: &[&str] = &["project", "action"];

/// All tables, in an order that satisfies foreign keys on delete.
pub const ALL_TABLES: &[&str] = &["worklog", "project", "action"];

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS project (
    project_id TEXT PRIMARY KEY,
    project_name TEXT NOT NULL,
    description TEXT,
    project_key TEXT,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    deleted TEXT
);

CREATE TABLE IF NOT EXISTS action (
    action_id TEXT PRIMARY KEY,
    action_name TEXT NOT NULL,
    description TEXT,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    deleted TEXT
);

CREATE TABLE IF NOT EXISTS worklog (
    worklog_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES project(project_id),
    action_id TEXT NOT NULL REFERENCES action(action_id),
    timestamp TEXT NOT NULL,
    ticket_key TEXT
);

CREATE INDEX IF NOT EXISTS idx_worklog_timestamp ON worklog(timestamp);
"#;

/// Initialize all tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Drop all tables. Idempotent (uses IF EXISTS); worklog goes first so the
/// foreign keys never dangle.
pub fn drop_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS worklog;
         DROP TABLE IF EXISTS project;
         DROP TABLE IF EXISTS action;",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"project".to_string()));
        assert!(tables.contains(&"action".to_string()));
        assert!(tables.contains(&"worklog".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn drop_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        drop_schema(&conn).unwrap();
        drop_schema(&conn).unwrap(); // nothing left to drop, still fine

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('project','action','worklog')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn worklog_id_is_monotonic() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO project (project_id, project_name, created, updated) VALUES ('p1', 'p', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO action (action_id, action_name, created, updated) VALUES ('a1', 'a', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        for _ in 0..3 {
            conn.execute(
                "INSERT INTO worklog (project_id, action_id, timestamp) VALUES ('p1', 'a1', '2026-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();
        }

        let ids: Vec<i64> = conn
            .prepare("SELECT worklog_id FROM worklog ORDER BY worklog_id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
