//! Protocol error types.

use thiserror::Error;

use crate::grammar::GrammarError;
use crate::types::{ShapeError, Version};

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while framing, decoding or encoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream ended before a full header block or body was received.
    #[error("incomplete message: expected {expected} bytes, got {received}")]
    IncompleteMessage { expected: usize, received: usize },

    /// Stream ended inside a header block.
    #[error("incomplete header block: stream closed after {received} bytes")]
    TruncatedHeader { received: usize },

    /// Header block has no `Content-Length` entry.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// `Content-Length` is not a representable byte count.
    #[error("invalid Content-Length value: {0:?}")]
    InvalidContentLength(String),

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Header block is not ASCII/UTF-8 text.
    #[error("header block is not valid text")]
    InvalidHeader,

    /// Message body is not valid UTF-8.
    #[error("message body is not valid UTF-8")]
    InvalidUtf8,

    /// Malformed JSON.
    #[error("malformed JSON: {0}")]
    Grammar(#[from] GrammarError),

    /// A top-level JSON array (batch) was received.
    #[error("batch messages are not supported")]
    BatchNotSupported,

    /// The body is valid JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The mandatory `jsonrpc` member is absent.
    #[error("missing jsonrpc version")]
    MissingVersion,

    /// The `jsonrpc` member is not a decimal number, or has more fractional
    /// digits than [`crate::MAX_VERSION_SCALE`].
    #[error("invalid jsonrpc version: {0:?}")]
    InvalidVersion(String),

    /// The `id` member is not a 32-bit integer.
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    /// Outgoing message does not carry version 2.0.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(Version),

    /// Outgoing message fields do not form a valid JSON-RPC shape.
    #[error("invalid message shape: {0}")]
    InvalidShape(#[from] ShapeError),

    /// A raw `params`/`result`/`error` fragment is not one complete JSON value.
    #[error("invalid {field} fragment: {source}")]
    InvalidFragment {
        field: &'static str,
        #[source]
        source: GrammarError,
    },
}

impl ProtocolError {
    /// Returns true for faults after which the stream position is unknown.
    ///
    /// Grammar and shape faults only affect a single message; a reader can
    /// keep going after them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::IncompleteMessage { .. }
                | Self::TruncatedHeader { .. }
                | Self::MissingContentLength
                | Self::InvalidContentLength(_)
                | Self::MessageTooLarge { .. }
                | Self::InvalidHeader
        )
    }
}
