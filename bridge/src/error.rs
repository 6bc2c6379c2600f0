//! Error types for the bridge.

use std::time::Duration;

/// Errors produced while receiving and persisting a remote write request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store could not be reached at startup.
    #[error("connection error: {0}")]
    Connection(String),

    /// The request body is not a valid snappy block.
    ///
    /// Displays the decompressor's message verbatim since it is returned to
    /// the sender as the response body.
    #[error("{0}")]
    Decompression(String),

    /// The decompressed body is not a valid `WriteRequest` message.
    #[error("{0}")]
    Deserialization(String),

    /// A single row insert failed inside an open transaction.
    #[error("row execution failed: {0}")]
    RowExecution(String),

    /// The transaction could not be committed.
    #[error("commit failed: {0}")]
    Commit(String),

    /// Beginning a transaction or preparing the insert failed.
    #[error("store error: {0}")]
    Store(String),

    /// Beginning the transaction and executing its rows exceeded the
    /// configured deadline.
    #[error("store interaction timed out after {0:?}")]
    Timeout(Duration),

    /// Startup configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for errors caused by a malformed inbound payload.
    pub fn is_payload_error(&self) -> bool {
        matches!(self, Error::Decompression(_) | Error::Deserialization(_))
    }
}

impl From<clickhouse::error::Error> for Error {
    fn from(err: clickhouse::error::Error) -> Self {
        Error::Store(err.to_string())
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
