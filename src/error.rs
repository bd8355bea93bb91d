//! Error taxonomy shared by the dispatcher, storage backends, and listener.
//!
//! Every variant carries a human-readable message; the listener converts any of
//! these into an error response on the wire, so nothing here terminates the
//! process once a connection has been accepted.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The connection closed before a complete request document arrived.
    #[error("empty request: connection closed before a complete document was received")]
    EmptyRequest,

    /// The request bytes were not a valid JSON document of the expected shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The `request` field named a kind that is not in the dispatch table.
    #[error("unknown request '{0}'")]
    UnknownRequest(String),

    /// The payload was absent, null, or missing a required field.
    #[error("missing payload: {0}")]
    MissingPayload(String),

    /// A scalar inside the payload (modifier expression, timestamp) did not parse.
    #[error("parse error: {0}")]
    Parse(String),

    /// A referenced entity or worklog entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage backend rejected the operation (I/O, constraint, connection).
    #[error("write error: {0}")]
    Write(String),

    /// Connection-level failure while reading or writing a message.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// A WriteError for operations a sink-only backend cannot service.
    pub(crate) fn unsupported(driver: &str, operation: &str) -> Self {
        Error::Write(format!("backend '{driver}' does not support {operation}"))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Write(e.to_string())
    }
}

impl From<postgres::Error> for Error {
    fn from(e: postgres::Error) -> Self {
        Error::Write(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Write(e.to_string())
    }
}
