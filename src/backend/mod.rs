//! Storage backends: the polymorphic sink every request is routed into.
//!
//! One concrete type per configured driver, all behind [`StorageBackend`].
//! The SQL backends ([`SqliteBackend`], [`PostgresBackend`]) carry the full
//! entity store; the sinks (stdout, CSV, log) only accept worklog events and
//! reject entity operations with a write error, the way the original engines
//! without a database did. The backend is chosen once at startup; call sites
//! never branch on the driver again.

mod csv;
mod postgres;
mod sqlite;

pub use self::csv::CsvBackend;
pub use self::postgres::PostgresBackend;
pub use self::sqlite::SqliteBackend;

use anyhow::Result as AnyResult;
use chrono::Duration;

use crate::config::{Driver, TempoConfig};
use crate::error::{Error, Result};
use crate::store::{
    worklog::resolve_timestamp, Action, NewAction, NewProject, NewWorklog, Project, Worklog,
};

/// The capability surface the dispatcher routes into.
///
/// `append_worklog` is the one operation every variant services. Entity
/// operations default to a write error naming the driver; schema management
/// defaults to a no-op for variants with no schema to manage.
pub trait StorageBackend: Send {
    /// The configured driver name, used in log lines and error messages.
    fn driver(&self) -> &'static str;

    /// Persist one worklog event. The common `write(record)` capability.
    fn append_worklog(&mut self, entry: &NewWorklog) -> Result<Worklog>;

    fn insert_projects(&mut self, projects: &[NewProject]) -> Result<Vec<Project>> {
        let _ = projects;
        Err(Error::unsupported(self.driver(), "project storage"))
    }

    fn list_projects(&mut self, include_deleted: bool) -> Result<Vec<Project>> {
        let _ = include_deleted;
        Err(Error::unsupported(self.driver(), "project storage"))
    }

    fn soft_delete_projects(&mut self, ids: &[String]) -> Result<u64> {
        let _ = ids;
        Err(Error::unsupported(self.driver(), "project storage"))
    }

    fn annotate_project(
        &mut self,
        id: &str,
        description: Option<&str>,
        key: Option<&str>,
    ) -> Result<Project> {
        let _ = (id, description, key);
        Err(Error::unsupported(self.driver(), "project storage"))
    }

    fn insert_actions(&mut self, actions: &[NewAction]) -> Result<Vec<Action>> {
        let _ = actions;
        Err(Error::unsupported(self.driver(), "action storage"))
    }

    fn list_actions(&mut self, include_deleted: bool) -> Result<Vec<Action>> {
        let _ = include_deleted;
        Err(Error::unsupported(self.driver(), "action storage"))
    }

    fn soft_delete_actions(&mut self, ids: &[String]) -> Result<u64> {
        let _ = ids;
        Err(Error::unsupported(self.driver(), "action storage"))
    }

    /// Shift the last worklog entry's timestamp by a signed duration and
    /// return a `"<old> → <new>"` summary.
    fn modify_last_worklog(&mut self, delta: Duration) -> Result<String> {
        let _ = delta;
        Err(Error::unsupported(self.driver(), "worklog amendment"))
    }

    /// Physically remove the last worklog entry.
    fn remove_last_worklog(&mut self) -> Result<String> {
        Err(Error::unsupported(self.driver(), "worklog amendment"))
    }

    /// Create the persisted layout. Idempotent.
    fn init_schema(&mut self) -> Result<()> {
        Ok(())
    }

    /// Tear the persisted layout down. Idempotent.
    fn drop_schema(&mut self) -> Result<()> {
        Ok(())
    }

    /// Physically delete soft-deleted rows from every table that has them.
    fn prune_deleted(&mut self) -> Result<()> {
        Ok(())
    }

    /// Delete all rows without dropping the layout.
    fn truncate(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Construct the backend selected by the configuration. Connection or file
/// errors here are fatal startup errors.
pub fn create_backend(config: &TempoConfig) -> AnyResult<Box<dyn StorageBackend + Send>> {
    let backend: Box<dyn StorageBackend + Send> = match config.backend.driver {
        Driver::Stdout => Box::new(StdoutBackend::new()),
        Driver::Log => Box::new(LogBackend::new()),
        Driver::Csv => Box::new(CsvBackend::new(config.csv.clone())?),
        Driver::Sqlite => Box::new(SqliteBackend::open(config.resolved_db_path())?),
        Driver::Postgres => Box::new(PostgresBackend::connect(&config.postgres)?),
    };
    tracing::info!(driver = backend.driver(), "storage backend ready");
    Ok(backend)
}

/// Prints each worklog record to stdout as one JSON line. Fails only when
/// stdout itself is gone.
pub struct StdoutBackend {
    next_id: i64,
}

impl StdoutBackend {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }
}

impl Default for StdoutBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for StdoutBackend {
    fn driver(&self) -> &'static str {
        "stdout"
    }

    fn append_worklog(&mut self, entry: &NewWorklog) -> Result<Worklog> {
        let worklog = Worklog {
            worklog_id: self.next_id,
            project_id: entry.project_id.clone(),
            action_id: entry.action_id.clone(),
            timestamp: resolve_timestamp(entry)?,
            ticket_key: entry.ticket_key.clone(),
        };

        let line = serde_json::to_string(&worklog)
            .map_err(|e| Error::Write(format!("cannot encode worklog record: {e}")))?;
        use std::io::Write;
        writeln!(std::io::stdout(), "{line}")
            .map_err(|e| Error::Write(format!("cannot write to stdout: {e}")))?;

        self.next_id += 1;
        Ok(worklog)
    }
}

/// Inert sink: accepts every worklog event and only traces it. Valid but
/// deliberately does nothing.
pub struct LogBackend {
    next_id: i64,
}

impl LogBackend {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }
}

impl Default for LogBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for LogBackend {
    fn driver(&self) -> &'static str {
        "log"
    }

    fn append_worklog(&mut self, entry: &NewWorklog) -> Result<Worklog> {
        let worklog = Worklog {
            worklog_id: self.next_id,
            project_id: entry.project_id.clone(),
            action_id: entry.action_id.clone(),
            timestamp: resolve_timestamp(entry)?,
            ticket_key: entry.ticket_key.clone(),
        };
        tracing::debug!(
            project_id = %worklog.project_id,
            action_id = %worklog.action_id,
            timestamp = %worklog.timestamp,
            "worklog event discarded by log backend"
        );
        self.next_id += 1;
        Ok(worklog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> NewWorklog {
        NewWorklog {
            project_id: "p1".into(),
            action_id: "a1".into(),
            timestamp: Some("2026-02-03T12:00:00+00:00".into()),
            ticket_key: None,
        }
    }

    #[test]
    fn log_backend_accepts_writes_and_counts_ids() {
        let mut backend = LogBackend::new();
        let first = backend.append_worklog(&entry()).unwrap();
        let second = backend.append_worklog(&entry()).unwrap();
        assert_eq!(first.worklog_id, 1);
        assert_eq!(second.worklog_id, 2);
    }

    #[test]
    fn sink_backends_reject_entity_operations() {
        let mut backend = LogBackend::new();
        let err = backend.list_projects(false).unwrap_err();
        assert!(err.to_string().contains("backend 'log' does not support"));

        let err = backend.remove_last_worklog().unwrap_err();
        assert!(matches!(err, Error::Write(_)));
    }

    #[test]
    fn sink_backends_have_no_schema_to_manage() {
        let mut backend = StdoutBackend::new();
        backend.init_schema().unwrap();
        backend.drop_schema().unwrap();
        backend.prune_deleted().unwrap();
        backend.truncate().unwrap();
    }
}
