//! End-to-end exchanges against a live listener: TCP one-shot connections,
//! WebSocket sessions, error responses, and the concurrent-removal race.

mod helpers;

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use helpers::{seed_action, seed_project, seed_worklog, shared_backend};
use tempo::server::{serve_tcp, serve_websocket, SharedBackend};

/// Bind an ephemeral port, spawn the TCP accept loop, return the address.
async fn start_tcp_server(backend: SharedBackend) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve_tcp(listener, backend).await;
    });
    addr
}

async fn start_websocket_server(backend: SharedBackend) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve_websocket(listener, backend).await;
    });
    addr
}

/// One raw exchange: send the bytes as a line, read one response line.
async fn exchange(addr: std::net::SocketAddr, body: &str) -> Value {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();

    write_half.write_all(body.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    write_half.flush().await.unwrap();

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    serde_json::from_str(&line).unwrap()
}

fn response_of(value: &Value) -> &Value {
    value.get("response").expect("response key missing")
}

#[tokio::test]
async fn known_request_gets_a_documented_response() {
    let addr = start_tcp_server(shared_backend()).await;

    let reply = exchange(
        addr,
        r#"{"request":"insert_projects","payload":{"projects":[{"name":"alpha"}]}}"#,
    )
    .await;

    let projects = response_of(&reply)["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["project_name"], "alpha");
    assert!(!projects[0]["project_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_request_is_answered_not_dropped() {
    let addr = start_tcp_server(shared_backend()).await;

    let reply = exchange(addr, r#"{"request":"bogus_kind"}"#).await;
    let message = response_of(&reply).as_str().unwrap();
    assert!(message.contains("unknown request 'bogus_kind'"));

    // the listener is still alive for the next connection
    let reply = exchange(addr, r#"{"request":"get_projects"}"#).await;
    assert!(response_of(&reply)["projects"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_answered() {
    let addr = start_tcp_server(shared_backend()).await;

    let reply = exchange(addr, "this is not json").await;
    let message = response_of(&reply).as_str().unwrap();
    assert!(message.starts_with("malformed request"));
}

#[tokio::test]
async fn missing_payload_is_answered() {
    let addr = start_tcp_server(shared_backend()).await;

    let reply = exchange(addr, r#"{"request":"insert_projects"}"#).await;
    let message = response_of(&reply).as_str().unwrap();
    assert!(message.starts_with("missing payload"));
}

#[tokio::test]
async fn eof_before_any_bytes_is_an_empty_request() {
    let addr = start_tcp_server(shared_backend()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    drop(write_half); // close the write side without sending anything

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();

    let reply: Value = serde_json::from_str(&line).unwrap();
    let message = response_of(&reply).as_str().unwrap();
    assert!(message.starts_with("empty request"));
}

#[tokio::test]
async fn websocket_session_carries_many_exchanges() {
    let addr = start_websocket_server(shared_backend()).await;

    let url = format!("ws://{addr}");
    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    // first exchange: insert
    ws.send(Message::Text(
        r#"{"request":"insert_actions","payload":{"actions":[{"name":"meeting"}]}}"#.to_string(),
    ))
    .await
    .unwrap();
    let reply: Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    };
    let id = response_of(&reply)["actions"][0]["action_id"]
        .as_str()
        .unwrap()
        .to_string();

    // second exchange on the same session: the insert is visible
    ws.send(Message::Text(r#"{"request":"get_actions"}"#.to_string()))
        .await
        .unwrap();
    let reply: Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    };
    assert_eq!(response_of(&reply)["actions"][0]["action_id"], id.as_str());

    // a bad request keeps the session open
    ws.send(Message::Text("not json".to_string())).await.unwrap();
    let reply: Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    };
    assert!(response_of(&reply).as_str().unwrap().starts_with("malformed request"));

    ws.send(Message::Text(r#"{"request":"get_data"}"#.to_string()))
        .await
        .unwrap();
    let reply: Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    };
    assert_eq!(response_of(&reply)["actions"].as_array().unwrap().len(), 1);

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn concurrent_removals_leave_one_winner_and_an_empty_log() {
    let backend = shared_backend();

    {
        let mut guard = backend.lock().unwrap();
        let backend = guard.as_mut();
        let project = seed_project(backend, "alpha");
        let action = seed_action(backend, "meeting");
        seed_worklog(backend, &project, &action, None);
    }

    let addr = start_tcp_server(Arc::clone(&backend)).await;

    let request = r#"{"request":"remove_worklog"}"#;
    let (first, second) = tokio::join!(exchange(addr, request), exchange(addr, request));

    let responses = [
        response_of(&first).as_str().unwrap().to_string(),
        response_of(&second).as_str().unwrap().to_string(),
    ];

    let winners = responses
        .iter()
        .filter(|r| r.as_str() == "Removed last worklog")
        .count();
    let losers = responses.iter().filter(|r| r.contains("not found")).count();
    assert_eq!(winners, 1, "responses: {responses:?}");
    assert_eq!(losers, 1, "responses: {responses:?}");

    // the log is empty, not negative: a further removal also fails
    let reply = exchange(addr, request).await;
    assert!(response_of(&reply).as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn modify_worklog_shifts_by_exactly_the_delta_on_the_wire() {
    let backend = shared_backend();

    {
        let mut guard = backend.lock().unwrap();
        let backend = guard.as_mut();
        let project = seed_project(backend, "alpha");
        let action = seed_action(backend, "meeting");
        seed_worklog(backend, &project, &action, Some("2026-02-03T12:00:00+00:00"));
    }

    let addr = start_tcp_server(backend).await;

    let reply = exchange(
        addr,
        r#"{"request":"modify_worklog","payload":{"modifier":"+1h"}}"#,
    )
    .await;
    let message = response_of(&reply).as_str().unwrap();
    assert!(message.contains("2026-02-03T12:00:00+00:00"));
    assert!(message.contains("2026-02-03T13:00:00+00:00"));
}
