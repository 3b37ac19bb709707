//! Server configuration.
//!
//! Settings live in `config.toml`, by default at
//! `~/.config/lspwire/config.toml`. Every key is optional:
//!
//! ```toml
//! log_dir = "/var/tmp/lspwire"
//! max_message_size = 1048576
//! read_chunk_size = 4096
//! echo = true
//! dump_params = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use lspwire_protocol::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MAX_MESSAGE_SIZE};

use crate::error::{ServerError, ServerResult};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory for event log files. No file log when unset.
    pub log_dir: Option<PathBuf>,

    /// Largest accepted message body, in bytes.
    pub max_message_size: usize,

    /// Bytes requested from stdin per read.
    pub read_chunk_size: usize,

    /// Re-encode every decoded message and write it to stdout.
    pub echo: bool,

    /// Build and log a parameter tree for every message with object params.
    pub dump_params: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            max_message_size: MAX_MESSAGE_SIZE,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            echo: true,
            dump_params: false,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> ServerResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lspwire")
    }

    /// Rejects values the framer cannot work with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.max_message_size == 0 {
            return Err(ServerError::config("max_message_size must be greater than zero"));
        }
        if self.read_chunk_size == 0 {
            return Err(ServerError::config("read_chunk_size must be greater than zero"));
        }
        if self.read_chunk_size > MAX_CHUNK_SIZE {
            return Err(ServerError::config(format!(
                "read_chunk_size must not exceed {MAX_CHUNK_SIZE}"
            )));
        }
        Ok(())
    }

    /// Builder: set the event log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Builder: set the maximum message size.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Builder: set the read chunk size.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Builder: enable or disable echo.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Builder: enable or disable parameter dumps.
    pub fn with_dump_params(mut self, dump: bool) -> Self {
        self.dump_params = dump;
        self
    }
}
