//! Error types for betstream.

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading the configuration file.
    #[error("config file error: {0}")]
    ConfigFile(#[from] serde_json::Error),

    /// A required configuration value is missing or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Protocol error (oversized frame, reply that violates the grammar).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The bet file could not be opened or read.
    #[error("record source error: {0}")]
    Source(#[source] std::io::Error),

    /// Connection closed before a full frame was transferred.
    #[error("connection closed mid-frame")]
    ConnectionClosed,

    /// Session aborted by the shutdown monitor.
    #[error("session cancelled")]
    Cancelled,
}

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
