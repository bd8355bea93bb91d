//! Embedded-file SQL backend over rusqlite.
//!
//! Owns one connection for the lifetime of the process and delegates every
//! operation to the entity store modules, which run each mutation inside a
//! transaction.

use std::path::Path;

use chrono::Duration;
use rusqlite::Connection;

use crate::db::{self, schema};
use crate::error::Result;
use crate::store::{action, project, worklog};
use crate::store::{Action, NewAction, NewProject, NewWorklog, Project, Worklog};

use super::StorageBackend;

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database file, with pragmas and schema applied.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_database(path)?,
        })
    }

    /// In-memory variant for the test suites.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_memory_database()?,
        })
    }
}

impl StorageBackend for SqliteBackend {
    fn driver(&self) -> &'static str {
        "sqlite"
    }

    fn append_worklog(&mut self, entry: &NewWorklog) -> Result<Worklog> {
        worklog::append_worklog(&mut self.conn, entry)
    }

    fn insert_projects(&mut self, projects: &[NewProject]) -> Result<Vec<Project>> {
        project::insert_projects(&mut self.conn, projects)
    }

    fn list_projects(&mut self, include_deleted: bool) -> Result<Vec<Project>> {
        project::list_projects(&self.conn, include_deleted)
    }

    fn soft_delete_projects(&mut self, ids: &[String]) -> Result<u64> {
        project::soft_delete_projects(&mut self.conn, ids)
    }

    fn annotate_project(
        &mut self,
        id: &str,
        description: Option<&str>,
        key: Option<&str>,
    ) -> Result<Project> {
        project::annotate_project(&mut self.conn, id, description, key)
    }

    fn insert_actions(&mut self, actions: &[NewAction]) -> Result<Vec<Action>> {
        action::insert_actions(&mut self.conn, actions)
    }

    fn list_actions(&mut self, include_deleted: bool) -> Result<Vec<Action>> {
        action::list_actions(&self.conn, include_deleted)
    }

    fn soft_delete_actions(&mut self, ids: &[String]) -> Result<u64> {
        action::soft_delete_actions(&mut self.conn, ids)
    }

    fn modify_last_worklog(&mut self, delta: Duration) -> Result<String> {
        worklog::modify_last_worklog(&mut self.conn, delta)
    }

    fn remove_last_worklog(&mut self) -> Result<String> {
        worklog::remove_last_worklog(&mut self.conn)
    }

    fn init_schema(&mut self) -> Result<()> {
        schema::init_schema(&self.conn)?;
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        schema::drop_schema(&self.conn)?;
        Ok(())
    }

    fn prune_deleted(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in schema::SOFT_DELETE_TABLES {
            tx.execute(
                &format!("DELETE FROM {table} WHERE deleted IS NOT NULL"),
                [],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn truncate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in schema::ALL_TABLES {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        Ok(())
    }
}
