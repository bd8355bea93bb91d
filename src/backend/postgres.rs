//! Client/server SQL backend over a synchronous PostgreSQL connection.
//!
//! Same capability surface as the SQLite backend, with Postgres SQL. The
//! connection is established once at startup; connection failures there are
//! fatal, connection failures later surface as write errors on the affected
//! request.

use chrono::{DateTime, Duration, Utc};
use postgres::{Client, NoTls, Row};

use crate::config::PostgresConfig;
use crate::error::{Error, Result};
use crate::store::{Action, NewAction, NewProject, NewWorklog, Project, Worklog};

use super::StorageBackend;

const SCHEMA_SQL: &str = "
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
    worklog_id BIGSERIAL PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES project(project_id),
    action_id TEXT NOT NULL REFERENCES action(action_id),
    timestamp TEXT NOT NULL,
    ticket_key TEXT
);

CREATE INDEX IF NOT EXISTS idx_worklog_timestamp ON worklog(timestamp);
";

const SOFT_DELETE_TABLES: &[&str] = &["project", "action"];
const ALL_TABLES: &[&str] = &["worklog", "project", "action"];

const PROJECT_COLUMNS: &str =
    "project_id, project_name, description, project_key, created, updated, deleted";
const ACTION_COLUMNS: &str = "action_id, action_name, description, created, updated, deleted";
const WORKLOG_COLUMNS: &str = "worklog_id, project_id, action_id, timestamp, ticket_key";

fn row_to_project(row: &Row) -> Project {
    Project {
        project_id: row.get(0),
        project_name: row.get(1),
        description: row.get(2),
        project_key: row.get(3),
        created: row.get(4),
        updated: row.get(5),
        deleted: row.get(6),
    }
}

fn row_to_action(row: &Row) -> Action {
    Action {
        action_id: row.get(0),
        action_name: row.get(1),
        description: row.get(2),
        created: row.get(3),
        updated: row.get(4),
        deleted: row.get(5),
    }
}

fn row_to_worklog(row: &Row) -> Worklog {
    Worklog {
        worklog_id: row.get(0),
        project_id: row.get(1),
        action_id: row.get(2),
        timestamp: row.get(3),
        ticket_key: row.get(4),
    }
}

pub struct PostgresBackend {
    client: Client,
}

impl PostgresBackend {
    /// Connect and make sure the schema exists.
    pub fn connect(config: &PostgresConfig) -> anyhow::Result<Self> {
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .user(&config.username)
            .dbname(&config.database);
        if !config.password.is_empty() {
            pg.password(&config.password);
        }

        let mut client = pg.connect(NoTls)?;
        client.batch_execute(SCHEMA_SQL)?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "postgres connection ready"
        );
        Ok(Self { client })
    }
}

impl StorageBackend for PostgresBackend {
    fn driver(&self) -> &'static str {
        "postgres"
    }

    fn append_worklog(&mut self, entry: &NewWorklog) -> Result<Worklog> {
        let timestamp = crate::store::worklog::resolve_timestamp(entry)?;

        let mut tx = self.client.transaction()?;
        let row = tx.query_one(
            "INSERT INTO worklog (project_id, action_id, timestamp, ticket_key) \
             VALUES ($1, $2, $3, $4) RETURNING worklog_id",
            &[
                &entry.project_id,
                &entry.action_id,
                &timestamp,
                &entry.ticket_key,
            ],
        )?;
        let worklog_id: i64 = row.get(0);
        tx.commit()?;

        Ok(Worklog {
            worklog_id,
            project_id: entry.project_id.clone(),
            action_id: entry.action_id.clone(),
            timestamp,
            ticket_key: entry.ticket_key.clone(),
        })
    }

    fn insert_projects(&mut self, projects: &[NewProject]) -> Result<Vec<Project>> {
        for p in projects {
            if p.name.trim().is_empty() {
                return Err(Error::MissingPayload(
                    "project name must not be empty".into(),
                ));
            }
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.client.transaction()?;

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
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &project.project_id,
                    &project.project_name,
                    &project.description,
                    &project.project_key,
                    &project.created,
                    &project.updated,
                ],
            )?;
            inserted.push(project);
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn list_projects(&mut self, include_deleted: bool) -> Result<Vec<Project>> {
        let sql = if include_deleted {
            format!("SELECT {PROJECT_COLUMNS} FROM project ORDER BY project_name")
        } else {
            format!(
                "SELECT {PROJECT_COLUMNS} FROM project WHERE deleted IS NULL ORDER BY project_name"
            )
        };
        let rows = self.client.query(sql.as_str(), &[])?;
        Ok(rows.iter().map(row_to_project).collect())
    }

    fn soft_delete_projects(&mut self, ids: &[String]) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.client.transaction()?;

        let mut stamped = 0u64;
        for id in ids {
            stamped += tx.execute(
                "UPDATE project SET deleted = $1, updated = $1 \
                 WHERE project_id = $2 AND deleted IS NULL",
                &[&now, id],
            )?;
        }

        tx.commit()?;
        Ok(stamped)
    }

    fn annotate_project(
        &mut self,
        id: &str,
        description: Option<&str>,
        key: Option<&str>,
    ) -> Result<Project> {
        if description.is_none() && key.is_none() {
            return Err(Error::MissingPayload(
                "annotate_project requires at least one of description or key".into(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.client.transaction()?;

        let rows = tx.execute(
            "UPDATE project SET \
                 description = COALESCE($1, description), \
                 project_key = COALESCE($2, project_key), \
                 updated = $3 \
             WHERE project_id = $4 AND deleted IS NULL",
            &[&description, &key, &now, &id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("project '{id}'")));
        }

        let sql = format!("SELECT {PROJECT_COLUMNS} FROM project WHERE project_id = $1");
        let row = tx.query_one(sql.as_str(), &[&id])?;
        let project = row_to_project(&row);
        tx.commit()?;
        Ok(project)
    }

    fn insert_actions(&mut self, actions: &[NewAction]) -> Result<Vec<Action>> {
        for a in actions {
            if a.name.trim().is_empty() {
                return Err(Error::MissingPayload("action name must not be empty".into()));
            }
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.client.transaction()?;

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
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &action.action_id,
                    &action.action_name,
                    &action.description,
                    &action.created,
                    &action.updated,
                ],
            )?;
            inserted.push(action);
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn list_actions(&mut self, include_deleted: bool) -> Result<Vec<Action>> {
        let sql = if include_deleted {
            format!("SELECT {ACTION_COLUMNS} FROM action ORDER BY action_name")
        } else {
            format!(
                "SELECT {ACTION_COLUMNS} FROM action WHERE deleted IS NULL ORDER BY action_name"
            )
        };
        let rows = self.client.query(sql.as_str(), &[])?;
        Ok(rows.iter().map(row_to_action).collect())
    }

    fn soft_delete_actions(&mut self, ids: &[String]) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.client.transaction()?;

        let mut stamped = 0u64;
        for id in ids {
            stamped += tx.execute(
                "UPDATE action SET deleted = $1, updated = $1 \
                 WHERE action_id = $2 AND deleted IS NULL",
                &[&now, id],
            )?;
        }

        tx.commit()?;
        Ok(stamped)
    }

    fn modify_last_worklog(&mut self, delta: Duration) -> Result<String> {
        let mut tx = self.client.transaction()?;

        let sql = format!("SELECT {WORKLOG_COLUMNS} FROM worklog ORDER BY worklog_id DESC LIMIT 1");
        let row = tx.query_opt(sql.as_str(), &[])?;
        let Some(row) = row else {
            return Err(Error::NotFound("worklog is empty".into()));
        };
        let last = row_to_worklog(&row);

        let old = DateTime::parse_from_rfc3339(&last.timestamp).map_err(|e| {
            Error::Write(format!(
                "stored timestamp {:?} is not RFC 3339: {e}",
                last.timestamp
            ))
        })?;
        let new = (old + delta).to_rfc3339();

        tx.execute(
            "UPDATE worklog SET timestamp = $1 WHERE worklog_id = $2",
            &[&new, &last.worklog_id],
        )?;
        tx.commit()?;

        Ok(format!(
            "Modified last worklog: {} → {}",
            last.timestamp, new
        ))
    }

    fn remove_last_worklog(&mut self) -> Result<String> {
        let mut tx = self.client.transaction()?;

        let row = tx.query_opt(
            "SELECT worklog_id FROM worklog ORDER BY worklog_id DESC LIMIT 1",
            &[],
        )?;
        let Some(row) = row else {
            return Err(Error::NotFound("worklog is empty".into()));
        };
        let worklog_id: i64 = row.get(0);

        tx.execute("DELETE FROM worklog WHERE worklog_id = $1", &[&worklog_id])?;
        tx.commit()?;

        Ok("Removed last worklog".to_string())
    }

    fn init_schema(&mut self) -> Result<()> {
        self.client.batch_execute(SCHEMA_SQL)?;
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        self.client.batch_execute(
            "DROP TABLE IF EXISTS worklog;
             DROP TABLE IF EXISTS project;
             DROP TABLE IF EXISTS action;",
        )?;
        Ok(())
    }

    fn prune_deleted(&mut self) -> Result<()> {
        let mut tx = self.client.transaction()?;
        for table in SOFT_DELETE_TABLES {
            let sql = format!("DELETE FROM {table} WHERE deleted IS NOT NULL");
            tx.execute(sql.as_str(), &[])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn truncate(&mut self) -> Result<()> {
        let mut tx = self.client.transaction()?;
        for table in ALL_TABLES {
            let sql = format!("DELETE FROM {table}");
            tx.execute(sql.as_str(), &[])?;
        }
        tx.commit()?;
        Ok(())
    }
}
