//! CLI command handlers. Everything except `db` administration is a thin
//! client: build one request, send it to the server, print the response.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::client::send_request;
use crate::config::TempoConfig;
use crate::protocol::{Request, RequestKind};
use crate::store::{Action, NewAction, NewProject, NewWorklog, Project};

/// Render a response value for the terminal: strings bare, the rest as JSON.
fn response_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn projects_from(value: &Value) -> Result<Vec<Project>> {
    serde_json::from_value(value["projects"].clone())
        .with_context(|| format!("unexpected server response: {value}"))
}

fn actions_from(value: &Value) -> Result<Vec<Action>> {
    serde_json::from_value(value["actions"].clone())
        .with_context(|| format!("unexpected server response: {value}"))
}

pub async fn project_add(config: &TempoConfig, names: &[String]) -> Result<()> {
    let projects: Vec<NewProject> = names
        .iter()
        .map(|name| NewProject {
            id: None,
            name: name.clone(),
            description: None,
            key: None,
        })
        .collect();

    let request = Request::new(
        RequestKind::InsertProjects,
        Some(json!({ "projects": projects })),
    );
    let response = send_request(config, &request).await?;

    for project in projects_from(&response)? {
        println!("{}\t{}", project.project_id, project.project_name);
    }
    Ok(())
}

pub async fn project_list(config: &TempoConfig) -> Result<()> {
    let request = Request::new(RequestKind::GetProjects, None);
    let response = send_request(config, &request).await?;

    for project in projects_from(&response)? {
        println!("{}\t{}", project.project_id, project.project_name);
    }
    Ok(())
}

pub async fn project_export(config: &TempoConfig) -> Result<()> {
    let request = Request::new(RequestKind::GetProjects, None);
    let response = send_request(config, &request).await?;

    let exported: Vec<Value> = projects_from(&response)?
        .into_iter()
        .map(|p| json!({ "project_id": p.project_id, "project_name": p.project_name }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&exported)?);
    Ok(())
}

pub async fn project_remove(config: &TempoConfig, ids: &[String]) -> Result<()> {
    let request = Request::new(RequestKind::RemoveProjects, Some(json!({ "projects": ids })));
    let response = send_request(config, &request).await?;
    println!("{}", response_text(&response));
    Ok(())
}

pub async fn action_add(config: &TempoConfig, names: &[String]) -> Result<()> {
    let actions: Vec<NewAction> = names
        .iter()
        .map(|name| NewAction {
            id: None,
            name: name.clone(),
            description: None,
        })
        .collect();

    let request = Request::new(RequestKind::InsertActions, Some(json!({ "actions": actions })));
    let response = send_request(config, &request).await?;

    for action in actions_from(&response)? {
        println!("{}\t{}", action.action_id, action.action_name);
    }
    Ok(())
}

pub async fn action_list(config: &TempoConfig) -> Result<()> {
    let request = Request::new(RequestKind::GetActions, None);
    let response = send_request(config, &request).await?;

    for action in actions_from(&response)? {
        println!("{}\t{}", action.action_id, action.action_name);
    }
    Ok(())
}

pub async fn action_export(config: &TempoConfig) -> Result<()> {
    let request = Request::new(RequestKind::GetActions, None);
    let response = send_request(config, &request).await?;

    let exported: Vec<Value> = actions_from(&response)?
        .into_iter()
        .map(|a| json!({ "action_id": a.action_id, "action_name": a.action_name }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&exported)?);
    Ok(())
}

pub async fn action_remove(config: &TempoConfig, ids: &[String]) -> Result<()> {
    let request = Request::new(RequestKind::RemoveActions, Some(json!({ "actions": ids })));
    let response = send_request(config, &request).await?;
    println!("{}", response_text(&response));
    Ok(())
}

pub async fn worklog_add(
    config: &TempoConfig,
    project: &str,
    action: &str,
    ticket: Option<&str>,
) -> Result<()> {
    let entry = NewWorklog {
        project_id: project.to_string(),
        action_id: action.to_string(),
        timestamp: None,
        ticket_key: ticket.map(Into::into),
    };

    let request = Request::new(RequestKind::AddWorklog, Some(serde_json::to_value(&entry)?));
    let response = send_request(config, &request).await?;
    println!("{}", response_text(&response));
    Ok(())
}

pub async fn worklog_amend(config: &TempoConfig, modifier: &str) -> Result<()> {
    let request = Request::new(
        RequestKind::ModifyWorklog,
        Some(json!({ "modifier": modifier })),
    );
    let response = send_request(config, &request).await?;
    println!("{}", response_text(&response));
    Ok(())
}

pub async fn worklog_remove(config: &TempoConfig) -> Result<()> {
    let request = Request::new(RequestKind::RemoveWorklog, None);
    let response = send_request(config, &request).await?;
    println!("{}", response_text(&response));
    Ok(())
}

pub async fn annotate(
    config: &TempoConfig,
    project: &str,
    description: Option<&str>,
    key: Option<&str>,
) -> Result<()> {
    if description.is_none() && key.is_none() {
        bail!("pass at least one of --description <DESCRIPTION> or --key <KEY>");
    }

    let request = Request::new(
        RequestKind::AnnotateProject,
        Some(json!({
            "annotation": { "project": project, "description": description, "key": key }
        })),
    );
    let response = send_request(config, &request).await?;
    println!("{}", response_text(&response));
    Ok(())
}
