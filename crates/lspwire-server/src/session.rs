//! The read/decode/echo loop over one pair of byte streams.

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use lspwire_core::{EventCategory, EventLog, FileUri, Severity, record_event, uri_to_path};
use lspwire_protocol::{
    FrameReader, FrameWriter, Message, MessageKind, ParameterTree, ParameterValue, decode_message,
};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Message bodies taken off the stream, including rejected ones.
    pub read: usize,
    pub decoded: usize,
    /// Bodies that were not valid UTF-8 or did not decode.
    pub rejected: usize,
    pub echoed: usize,
}

/// A server session reading framed messages from `R` and echoing to `W`.
pub struct Session<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    log: Option<EventLog>,
    config: ServerConfig,
    stats: SessionStats,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Creates a session. Framing limits come from `config`.
    pub fn new(input: R, output: W, config: ServerConfig) -> Self {
        let reader = FrameReader::new(input)
            .with_max_message_size(config.max_message_size)
            .with_chunk_size(config.read_chunk_size);
        Self {
            reader,
            writer: FrameWriter::new(output),
            log: None,
            config,
            stats: SessionStats::default(),
        }
    }

    /// Also writes events to `log`.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn output(&self) -> &W {
        self.writer.get_ref()
    }

    /// Processes messages until the input ends.
    ///
    /// Messages that fail to decode or encode are logged and skipped. A
    /// framing fault ends the session with an error, since the position of
    /// the next message is unknown.
    pub fn run(&mut self) -> ServerResult<SessionStats> {
        self.record("Session started", EventCategory::Lifecycle, Severity::Info);

        loop {
            let body = match self.reader.read_message() {
                Ok(Some(body)) => body,
                Ok(None) => break,
                Err(e) if !e.is_fatal() => {
                    self.stats.read += 1;
                    self.stats.rejected += 1;
                    self.record(
                        &format!("Message skipped: {e}"),
                        EventCategory::Internal,
                        Severity::Warning,
                    );
                    continue;
                }
                Err(e) => {
                    self.record(
                        &format!("Input stream unusable: {e}"),
                        EventCategory::Lifecycle,
                        Severity::Error,
                    );
                    return Err(e.into());
                }
            };

            self.stats.read += 1;
            debug!(len = body.len(), "Received message");
            self.handle(&body)?;
        }

        self.record("Session ended", EventCategory::Lifecycle, Severity::Info);
        info!(
            read = self.stats.read,
            decoded = self.stats.decoded,
            rejected = self.stats.rejected,
            echoed = self.stats.echoed,
            "Input closed"
        );
        Ok(self.stats)
    }

    fn handle(&mut self, body: &str) -> ServerResult<()> {
        let message = match decode_message(body) {
            Ok(message) => message,
            Err(e) => {
                self.stats.rejected += 1;
                self.record(
                    &format!("Message rejected: {e}"),
                    EventCategory::Internal,
                    Severity::Warning,
                );
                return Ok(());
            }
        };
        self.stats.decoded += 1;

        match message.kind() {
            Ok(kind) => self.record(&describe(&message, kind), category_for(kind), Severity::Info),
            Err(e) => self.record(
                &format!("Message has invalid shape: {e}"),
                EventCategory::Internal,
                Severity::Warning,
            ),
        }

        if self.config.dump_params {
            self.dump_params(&message);
        }

        if self.config.echo {
            match self.writer.write_message(&message) {
                Ok(()) => {
                    self.writer.flush()?;
                    self.stats.echoed += 1;
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => self.record(
                    &format!("Message not echoed: {e}"),
                    EventCategory::Internal,
                    Severity::Warning,
                ),
            }
        }
        Ok(())
    }

    fn dump_params(&mut self, message: &Message) {
        let Some(params) = &message.params else {
            return;
        };
        if !params.as_str().starts_with('{') {
            debug!("Params are not an object, skipping dump");
            return;
        }

        let tree = match ParameterTree::parse(params.as_str()) {
            Ok(tree) => tree,
            Err(e) => {
                self.record(
                    &format!("Params not parsed: {e}"),
                    EventCategory::Internal,
                    Severity::Warning,
                );
                return;
            }
        };
        self.record(
            &format!("Params:\n{tree}"),
            EventCategory::Internal,
            Severity::Info,
        );

        let Some(uri) = tree
            .lookup(&["textDocument", "uri"])
            .and_then(ParameterValue::as_str)
        else {
            return;
        };
        let resolved = FileUri::parse(uri)
            .map_err(|e| e.to_string())
            .and_then(|parsed| uri_to_path(&parsed).map_err(|e| e.to_string()));
        match resolved {
            Ok(path) => self.record(
                &format!("Document path: {}", path.display()),
                EventCategory::Internal,
                Severity::Info,
            ),
            Err(e) => warn!(uri, error = %e, "Document URI is not a local file"),
        }
    }

    fn record(&mut self, event: &str, category: EventCategory, severity: Severity) {
        record_event(self.log.as_mut(), event, category, severity);
    }
}

fn category_for(kind: MessageKind) -> EventCategory {
    match kind {
        MessageKind::Request => EventCategory::Request,
        MessageKind::Notification => EventCategory::Notification,
        MessageKind::SuccessResponse | MessageKind::ErrorResponse => EventCategory::Response,
    }
}

fn describe(message: &Message, kind: MessageKind) -> String {
    let method = message.method.as_deref().unwrap_or_default();
    match message.id {
        Some(id) if kind.is_response() => format!("{kind} id={id}"),
        Some(id) => format!("{kind} id={id} method={method}"),
        None => format!("{kind} method={method}"),
    }
}
