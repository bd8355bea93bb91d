//! Command dispatch: maps a request kind to its handler.
//!
//! The table is the [`RequestKind`] enum: every kind has exactly one match arm,
//! and an unknown kind never reaches this module (it fails at
//! [`RequestKind::from_str`]). Handlers validate their payload, route into the
//! storage backend, and produce the response value. Each call runs to
//! completion before a response exists; the listener decides how the call is
//! scheduled.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::backend::StorageBackend;
use crate::error::{Error, Result};
use crate::modifier::parse_modifier;
use crate::protocol::RequestKind;
use crate::store::{NewAction, NewProject, NewWorklog};

#[derive(Deserialize)]
struct InsertProjectsParams {
    projects: Vec<NewProject>,
}

#[derive(Deserialize)]
struct RemoveProjectsParams {
    projects: Vec<String>,
}

#[derive(Deserialize)]
struct InsertActionsParams {
    actions: Vec<NewAction>,
}

#[derive(Deserialize)]
struct RemoveActionsParams {
    actions: Vec<String>,
}

#[derive(Deserialize)]
struct ModifyWorklogParams {
    modifier: String,
}

#[derive(Deserialize)]
struct AnnotateProjectParams {
    annotation: Annotation,
}

#[derive(Deserialize)]
struct Annotation {
    project: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

/// Deserialize the payload for a kind that requires one.
fn parse_payload<T: DeserializeOwned>(kind: RequestKind, payload: Option<&Value>) -> Result<T> {
    let value = match payload {
        None | Some(Value::Null) => {
            return Err(Error::MissingPayload(format!(
                "request '{kind}' requires a payload"
            )))
        }
        Some(value) => value,
    };
    serde_json::from_value(value.clone())
        .map_err(|e| Error::MissingPayload(format!("invalid payload for '{kind}': {e}")))
}

/// Resolve one request against the backend and produce its response value.
///
/// Listings exclude soft-deleted rows; callers that need deleted rows go
/// through backend administration, not the wire protocol.
pub fn dispatch(
    backend: &mut dyn StorageBackend,
    kind: RequestKind,
    payload: Option<&Value>,
) -> Result<Value> {
    match kind {
        RequestKind::InsertProjects => {
            let params: InsertProjectsParams = parse_payload(kind, payload)?;
            let projects = backend.insert_projects(&params.projects)?;
            Ok(json!({ "projects": projects }))
        }
        RequestKind::GetProjects => {
            let projects = backend.list_projects(false)?;
            Ok(json!({ "projects": projects }))
        }
        RequestKind::RemoveProjects => {
            let params: RemoveProjectsParams = parse_payload(kind, payload)?;
            let removed = backend.soft_delete_projects(&params.projects)?;
            Ok(json!({ "removed": removed }))
        }
        RequestKind::InsertActions => {
            let params: InsertActionsParams = parse_payload(kind, payload)?;
            let actions = backend.insert_actions(&params.actions)?;
            Ok(json!({ "actions": actions }))
        }
        RequestKind::GetActions => {
            let actions = backend.list_actions(false)?;
            Ok(json!({ "actions": actions }))
        }
        RequestKind::RemoveActions => {
            let params: RemoveActionsParams = parse_payload(kind, payload)?;
            let removed = backend.soft_delete_actions(&params.actions)?;
            Ok(json!({ "removed": removed }))
        }
        RequestKind::AddWorklog => {
            let entry: NewWorklog = parse_payload(kind, payload)?;
            let worklog = backend.append_worklog(&entry)?;
            Ok(json!({ "worklog": worklog }))
        }
        RequestKind::ModifyWorklog => {
            let params: ModifyWorklogParams = parse_payload(kind, payload)?;
            let delta = parse_modifier(&params.modifier)?;
            let message = backend.modify_last_worklog(delta)?;
            Ok(json!(message))
        }
        RequestKind::RemoveWorklog => {
            let message = backend.remove_last_worklog()?;
            Ok(json!(message))
        }
        RequestKind::AnnotateProject => {
            let params: AnnotateProjectParams = parse_payload(kind, payload)?;
            let annotation = params.annotation;
            let project = backend.annotate_project(
                &annotation.project,
                annotation.description.as_deref(),
                annotation.key.as_deref(),
            )?;
            Ok(json!({ "project": project }))
        }
        RequestKind::GetData => {
            let projects = backend.list_projects(false)?;
            let actions = backend.list_actions(false)?;
            Ok(json!({ "projects": projects, "actions": actions }))
        }
    }
}
