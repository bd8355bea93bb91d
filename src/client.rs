//! Client-side mirror of the listener: serialize one request, send it over
//! the configured transport, read one response, disconnect.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

use crate::config::{TempoConfig, Transport};
use crate::protocol::{Request, Response};

/// Send one request and return the server's response value. The response may
/// be an error string; the caller decides how to present it.
pub async fn send_request(config: &TempoConfig, request: &Request) -> Result<Value> {
    let line = serde_json::to_string(request)?;

    let raw = match config.server.transport {
        Transport::Tcp => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let stream = TcpStream::connect(&addr)
                .await
                .with_context(|| format!("failed to connect to {addr}"))?;
            exchange_line(stream, &line).await?
        }
        #[cfg(unix)]
        Transport::Unix => {
            let path = &config.server.socket_path;
            let stream = tokio::net::UnixStream::connect(path)
                .await
                .with_context(|| format!("failed to connect to {path}"))?;
            exchange_line(stream, &line).await?
        }
        #[cfg(not(unix))]
        Transport::Unix => {
            anyhow::bail!("unix socket transport is not supported on this platform")
        }
        Transport::Websocket => exchange_websocket(config, &line).await?,
    };

    let response: Response =
        serde_json::from_str(raw.trim()).context("server returned a malformed response")?;
    Ok(response.response)
}

/// One newline-terminated exchange over a byte stream (TCP or UNIX).
async fn exchange_line<S>(stream: S, line: &str) -> Result<String>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);

    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await?;

    let mut reader = BufReader::new(read_half);
    let mut response = String::new();
    reader.read_line(&mut response).await?;
    anyhow::ensure!(!response.is_empty(), "server closed without responding");
    Ok(response)
}

/// One exchange on a fresh WebSocket session.
async fn exchange_websocket(config: &TempoConfig, line: &str) -> Result<String> {
    let url = format!("ws://{}:{}", config.server.host, config.server.port);
    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;

    ws.send(Message::Text(line.to_string())).await?;

    let reply = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Close(_))) | None => {
                anyhow::bail!("server closed the session without responding")
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    };

    let _ = ws.close(None).await;
    Ok(reply)
}
