//! Server error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error on the protocol streams.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Fatal framing error; the stream can no longer be read.
    #[error("Protocol error: {0}")]
    Protocol(#[from] lspwire_protocol::ProtocolError),

    /// Event log could not be created.
    #[error("Event log error: {0}")]
    Log(#[from] lspwire_core::LogError),

    /// Configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::ServerConfig`].
    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration values are inconsistent.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
