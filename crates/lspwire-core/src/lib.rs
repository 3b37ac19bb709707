//! Shared plumbing: tracing setup, the event log, file URI normalization

pub mod logger;
pub mod tracing;
pub mod uri;

pub use logger::{EventCategory, EventLog, LogError, Severity, record_event};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use uri::{FileUri, UriError, path_to_uri, uri_to_path};
