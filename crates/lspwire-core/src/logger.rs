//! Append-only event log file.
//!
//! One file is created per process in the configured directory, named after
//! the local time it was opened:
//!
//! ```text
//! log-2026-10-18_09-41-07.txt
//! ```
//!
//! Each recorded event is one line:
//!
//! ```text
//! [2026-10-18 09:41:07] [Warning] [Request] message rejected: missing jsonrpc version
//! ```
//!
//! Every event is also emitted as a `tracing` event, so it shows up on
//! stderr even when no log directory is configured.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, error, info, warn};

const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const LINE_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What part of the server an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Lifecycle,
    Request,
    Response,
    Notification,
    Internal,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lifecycle => "Lifecycle",
            Self::Request => "Request",
            Self::Response => "Response",
            Self::Notification => "Notification",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from creating or writing the event log.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write log file: {0}")]
    Write(#[from] io::Error),
}

/// An open event log file.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: File,
}

impl EventLog {
    /// Creates `directory` if needed and starts a new log file in it.
    pub fn create(directory: impl AsRef<Path>) -> Result<Self, LogError> {
        Self::create_at(directory.as_ref(), Local::now())
    }

    fn create_at(directory: &Path, now: DateTime<Local>) -> Result<Self, LogError> {
        fs::create_dir_all(directory).map_err(|source| LogError::CreateDir {
            path: directory.to_path_buf(),
            source,
        })?;

        let path = directory.join(log_file_name(now));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;
        writeln!(file, "Log started")?;

        debug!(path = %path.display(), "Opened event log");
        Ok(Self { path, file })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one event line and mirrors it to tracing.
    pub fn record(
        &mut self,
        event: &str,
        category: EventCategory,
        severity: Severity,
    ) -> Result<(), LogError> {
        trace_event(event, category, severity);
        let line = format_line(Local::now(), event, category, severity);
        self.file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Records through `log` when present, otherwise only to tracing.
///
/// Write failures are reported at warn level and otherwise ignored.
pub fn record_event(
    log: Option<&mut EventLog>,
    event: &str,
    category: EventCategory,
    severity: Severity,
) {
    match log {
        Some(log) => {
            if let Err(e) = log.record(event, category, severity) {
                warn!(error = %e, path = %log.path().display(), "Failed to write event log");
            }
        }
        None => trace_event(event, category, severity),
    }
}

fn trace_event(event: &str, category: EventCategory, severity: Severity) {
    match severity {
        Severity::Info => info!(category = category.as_str(), "{event}"),
        Severity::Warning => warn!(category = category.as_str(), "{event}"),
        Severity::Error => error!(category = category.as_str(), "{event}"),
    }
}

fn log_file_name(now: DateTime<Local>) -> String {
    format!("log-{}.txt", now.format(FILE_STAMP_FORMAT))
}

fn format_line(
    now: DateTime<Local>,
    event: &str,
    category: EventCategory,
    severity: Severity,
) -> String {
    format!(
        "[{}] [{severity}] [{category}] {event}\n",
        now.format(LINE_STAMP_FORMAT)
    )
}
