//! tempo is a personal work-logging server.
//!
//! Clients record "I performed action A on project P now" events; the server
//! persists them to a configurable storage backend. One JSON request, one JSON
//! response: `{"request": <kind>, "payload": <object?>}` in,
//! `{"response": <value-or-error-string>}` out.
//!
//! # Architecture
//!
//! - **Transport**: TCP or UNIX socket (one newline-terminated exchange per
//!   connection) or WebSocket (one exchange per text frame, persistent session)
//! - **Dispatch**: a fixed request-kind table; unknown kinds are a checked
//!   error answered on the wire, never a crash
//! - **Storage**: pluggable backends (SQLite by default, PostgreSQL, CSV,
//!   stdout, or an inert log sink), chosen once at startup
//! - **Entities**: projects and actions soft-delete; the worklog is
//!   append-only, with amend/remove limited to the most recent entry
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`protocol`] — Wire message shapes and the request-kind table
//! - [`dispatch`] — Request handlers over the storage backend
//! - [`server`] — Connection listener for all three transports
//! - [`client`] — Client-side mirror: one request out, one response in
//! - [`backend`] — Storage backend trait and its implementations
//! - [`store`] — Entity records and SQLite entity operations
//! - [`modifier`] — `[+-][0-9]+[smh]` duration expressions

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod modifier;
pub mod protocol;
pub mod server;
pub mod store;

pub use error::{Error, Result};
