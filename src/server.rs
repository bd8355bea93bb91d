//! Connection listener for the TCP, UNIX-socket, and WebSocket transports.
//!
//! Every connection runs as its own task. TCP and UNIX connections carry
//! exactly one exchange: read one newline-terminated JSON request, dispatch,
//! write one `{"response": ...}` line, close. A WebSocket session stays open
//! and services one request per text frame, strictly in arrival order. Any
//! error past accept() is logged and answered as an error response; a failing
//! connection never takes the listener down.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use crate::backend::{self, StorageBackend};
use crate::config::{TempoConfig, Transport};
use crate::dispatch::dispatch;
use crate::error::Error;
use crate::protocol::{Request, RequestKind};

/// The storage backend shared by every connection. The mutex serializes
/// mutations, and each operation runs in its own transaction, so two racing
/// removals cannot both claim the same row.
pub type SharedBackend = Arc<Mutex<Box<dyn StorageBackend + Send>>>;

/// Bind the configured transport and serve forever. Bind and backend errors
/// here abort startup; nothing after accept() does.
pub async fn serve(config: TempoConfig) -> Result<()> {
    let backend = backend::create_backend(&config)?;
    let backend: SharedBackend = Arc::new(Mutex::new(backend));

    match config.server.transport {
        Transport::Tcp => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind tcp socket {addr}"))?;
            tracing::info!(addr = %listener.local_addr()?, "server listening (tcp)");
            serve_tcp(listener, backend).await
        }
        #[cfg(unix)]
        Transport::Unix => {
            let path = std::path::Path::new(&config.server.socket_path);
            if path.exists() {
                std::fs::remove_file(path).with_context(|| {
                    format!("failed to remove stale socket {}", path.display())
                })?;
            }
            let listener = tokio::net::UnixListener::bind(path)
                .with_context(|| format!("failed to bind unix socket {}", path.display()))?;
            tracing::info!(path = %path.display(), "server listening (unix)");
            serve_unix(listener, backend).await
        }
        #[cfg(not(unix))]
        Transport::Unix => {
            anyhow::bail!("unix socket transport is not supported on this platform")
        }
        Transport::Websocket => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind websocket listener {addr}"))?;
            tracing::info!(addr = %listener.local_addr()?, "server listening (websocket)");
            serve_websocket(listener, backend).await
        }
    }
}

/// Accept loop for the TCP transport.
pub async fn serve_tcp(listener: TcpListener, backend: SharedBackend) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            if let Err(e) = handle_stream(stream, backend).await {
                tracing::error!(peer = %peer, error = %e, "connection failed");
            }
        });
    }
}

/// Accept loop for the UNIX-socket transport.
#[cfg(unix)]
pub async fn serve_unix(listener: tokio::net::UnixListener, backend: SharedBackend) -> Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            if let Err(e) = handle_stream(stream, backend).await {
                tracing::error!(error = %e, "connection failed");
            }
        });
    }
}

/// Accept loop for the WebSocket transport.
pub async fn serve_websocket(listener: TcpListener, backend: SharedBackend) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            if let Err(e) = handle_websocket(stream, backend).await {
                tracing::error!(peer = %peer, error = %e, "websocket session failed");
            }
        });
    }
}

/// One request, one response, close. Shared by the TCP and UNIX transports.
async fn handle_stream<S>(stream: S, backend: SharedBackend) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    let response = match reader.read_line(&mut line).await {
        Ok(0) => {
            tracing::warn!("{}", Error::EmptyRequest);
            error_response(&Error::EmptyRequest)
        }
        Ok(_) => handle_request(&line, &backend).await,
        Err(e) => {
            let err = Error::Transport(e);
            tracing::warn!("{err}");
            error_response(&err)
        }
    };

    write_half.write_all(response.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await?;
    Ok(())
}

/// A persistent session: one request per text frame until the peer leaves.
async fn handle_websocket(stream: TcpStream, backend: SharedBackend) -> Result<()> {
    let mut ws = tokio_tungstenite::accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => {
                let response = handle_request(&text, &backend).await;
                ws.send(Message::Text(response)).await?;
            }
            Message::Binary(_) => {
                let err = Error::MalformedRequest("binary frames are not supported".into());
                tracing::warn!("{err}");
                ws.send(Message::Text(error_response(&err))).await?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}

/// Parse, dispatch, and serialize one exchange. Every failure becomes an
/// error response; nothing propagates past this point.
async fn handle_request(raw: &str, backend: &SharedBackend) -> String {
    match run_request(raw, backend).await {
        Ok(value) => json!({ "response": value }).to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "request failed");
            error_response(&e)
        }
    }
}

async fn run_request(raw: &str, backend: &SharedBackend) -> Result<Value, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let request: Request =
        serde_json::from_str(trimmed).map_err(|e| Error::MalformedRequest(e.to_string()))?;
    let kind: RequestKind = request.request.parse()?;
    tracing::debug!(request = %kind, "dispatching");

    // Backend I/O is synchronous; run it off the event loop (one request at a
    // time across all connections, serialized by the mutex).
    let backend = Arc::clone(backend);
    let payload = request.payload;
    tokio::task::spawn_blocking(move || {
        let mut guard = backend
            .lock()
            .map_err(|_| Error::Write("backend lock poisoned".into()))?;
        dispatch(guard.as_mut(), kind, payload.as_ref())
    })
    .await
    .map_err(|e| Error::Write(format!("dispatch task failed: {e}")))?
}

/// `{"response": "<message>"}`, the only shape errors take on the wire.
fn error_response(error: &Error) -> String {
    json!({ "response": error.to_string() }).to_string()
}
