//! Wire message shapes shared by the listener, the dispatcher, and the client.
//!
//! A client sends one JSON object `{"request": <kind>, "payload": <object?>}` and
//! receives one JSON object `{"response": <value-or-error-string>}` back. The
//! transport decides the framing (one line per TCP/UNIX connection, one text
//! frame per WebSocket exchange); the shapes here are transport-independent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// One client request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request kind, resolved against [`RequestKind`] by the dispatcher.
    pub request: String,
    /// Kind-specific arguments; some kinds take none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Request {
    pub fn new(kind: RequestKind, payload: Option<Value>) -> Self {
        Self {
            request: kind.as_str().to_string(),
            payload,
        }
    }
}

/// One server reply. On failure `response` holds the error message as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub response: Value,
}

/// The dispatch table's key space. Unknown strings are a checked error, never a
/// silent miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    InsertProjects,
    GetProjects,
    RemoveProjects,
    InsertActions,
    GetActions,
    RemoveActions,
    AddWorklog,
    ModifyWorklog,
    RemoveWorklog,
    AnnotateProject,
    GetData,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertProjects => "insert_projects",
            Self::GetProjects => "get_projects",
            Self::RemoveProjects => "remove_projects",
            Self::InsertActions => "insert_actions",
            Self::GetActions => "get_actions",
            Self::RemoveActions => "remove_actions",
            Self::AddWorklog => "add_worklog",
            Self::ModifyWorklog => "modify_worklog",
            Self::RemoveWorklog => "remove_worklog",
            Self::AnnotateProject => "annotate_project",
            Self::GetData => "get_data",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert_projects" => Ok(Self::InsertProjects),
            "get_projects" => Ok(Self::GetProjects),
            "remove_projects" => Ok(Self::RemoveProjects),
            "insert_actions" => Ok(Self::InsertActions),
            "get_actions" => Ok(Self::GetActions),
            "remove_actions" => Ok(Self::RemoveActions),
            "add_worklog" => Ok(Self::AddWorklog),
            "modify_worklog" => Ok(Self::ModifyWorklog),
            "remove_worklog" => Ok(Self::RemoveWorklog),
            "annotate_project" => Ok(Self::AnnotateProject),
            "get_data" => Ok(Self::GetData),
            _ => Err(Error::UnknownRequest(s.to_string())),
        }
    }
}
