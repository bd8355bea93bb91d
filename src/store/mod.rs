//! Entity record types and the operations over them.
//!
//! Defines [`Project`], [`Action`], and [`Worklog`] (full rows) plus the
//! [`NewProject`]/[`NewAction`]/[`NewWorklog`] payload shapes clients send.
//! Projects and actions are soft-deleted: removal stamps the `deleted` column
//! and default listings exclude stamped rows. Worklog entries are append-only;
//! only the most recent one can be amended or removed, and that removal is
//! physical.

pub mod action;
pub mod project;
pub mod worklog;

use serde::{Deserialize, Serialize};

/// A project row. `project_id` is an opaque string, minted once, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub project_name: String,
    pub description: Option<String>,
    /// External ticket-system linkage (e.g. a JIRA project key).
    pub project_key: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created: String,
    /// RFC 3339 last-modification timestamp.
    pub updated: String,
    /// RFC 3339 soft-delete timestamp, or `None` while the project is live.
    pub deleted: Option<String>,
}

/// An action row (what was done: "meeting", "review", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_id: String,
    pub action_name: String,
    pub description: Option<String>,
    pub created: String,
    pub updated: String,
    pub deleted: Option<String>,
}

/// A worklog row. `worklog_id` is the monotonic insertion sequence; the entry
/// with the maximum id is "the last worklog".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worklog {
    pub worklog_id: i64,
    pub project_id: String,
    pub action_id: String,
    /// RFC 3339 event timestamp.
    pub timestamp: String,
    pub ticket_key: Option<String>,
}

/// Payload shape for inserting a project. The server mints an id unless the
/// client supplies one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Payload shape for inserting an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload shape for recording a worklog event. Timestamp defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorklog {
    pub project_id: String,
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_key: Option<String>,
}
