//! Content-Length message framing.
//!
//! Each message is a block of CRLF-terminated headers, an empty line, and
//! exactly `Content-Length` bytes of UTF-8 JSON:
//!
//! ```text
//! Content-Length: 40\r\n
//! Content-Type: application/vscode-jsonrpc; charset=utf-8\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"ping"}
//! ```
//!
//! Only `Content-Length` is interpreted. Its name is matched without regard
//! to ASCII case; every other header is ignored.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};

use tracing::{debug, trace};

use crate::MAX_MESSAGE_SIZE;
use crate::encode::{encode_message, frame_body};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::Message;

/// Bytes requested from the underlying reader per read call.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Upper bound for [`FrameReader::with_chunk_size`].
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "content-length";

/// Reads framed message bodies from a byte stream.
///
/// The reader keeps bytes that arrived after the current message, so
/// pipelined messages delivered in one read are returned one per call.
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
    chunk_size: usize,
    max_message_size: usize,
}

impl<R: Read> FrameReader<R> {
    /// Creates a new FrameReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Sets the largest accepted `Content-Length`.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Sets how many bytes are requested per read, clamped to
    /// `1..=MAX_CHUNK_SIZE`.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Bytes received but not yet returned as part of a message.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Reads a single message body.
    ///
    /// Returns `Ok(None)` if the stream ends with nothing buffered. A stream
    /// that ends inside a header block or a body is an error, as is a header
    /// block without a usable `Content-Length`; after those the stream
    /// position is unknown and the reader should not be used again.
    ///
    /// A body that is not valid UTF-8 is consumed before
    /// [`ProtocolError::InvalidUtf8`] is returned, so the next call starts at
    /// the following message.
    pub fn read_message(&mut self) -> ProtocolResult<Option<String>> {
        // Bytes before `searched` are known not to start a terminator.
        let mut searched = 0;
        let header_end = loop {
            if let Some(pos) = find_terminator(&self.buffer[searched..]) {
                break searched + pos;
            }
            searched = self.buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
            if self.buffer.len() > self.max_message_size {
                return Err(ProtocolError::MessageTooLarge {
                    size: self.buffer.len(),
                    max: self.max_message_size,
                });
            }
            if self.fill()? == 0 {
                if self.buffer.is_empty() {
                    debug!("End of stream");
                    return Ok(None);
                }
                return Err(ProtocolError::TruncatedHeader {
                    received: self.buffer.len(),
                });
            }
        };

        let headers = parse_headers(&self.buffer[..header_end])?;
        let length = content_length(&headers)?;
        if length > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: length,
                max: self.max_message_size,
            });
        }

        let body_start = header_end + HEADER_TERMINATOR.len();
        let total = body_start
            .checked_add(length)
            .ok_or_else(|| ProtocolError::InvalidContentLength(length.to_string()))?;

        while self.buffer.len() < total {
            if self.fill()? == 0 {
                return Err(ProtocolError::IncompleteMessage {
                    expected: length,
                    received: self.buffer.len() - body_start,
                });
            }
        }

        let body: Vec<u8> = self.buffer.drain(..total).skip(body_start).collect();
        trace!(len = length, pending = self.buffer.len(), "Framed message");
        String::from_utf8(body)
            .map(Some)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    // Appends one chunk to the buffer, returning the byte count (0 at EOF).
    fn fill(&mut self) -> ProtocolResult<usize> {
        let start = self.buffer.len();
        self.buffer.resize(start + self.chunk_size, 0);
        loop {
            match self.reader.read(&mut self.buffer[start..]) {
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e.into());
                }
            }
        }
    }

    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Unwraps this FrameReader, returning the underlying reader.
    ///
    /// Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Splits the header block into a map keyed by lower-cased header name.
fn parse_headers(block: &[u8]) -> ProtocolResult<HashMap<String, String>> {
    let text = std::str::from_utf8(block).map_err(|_| ProtocolError::InvalidHeader)?;
    let mut headers = HashMap::new();
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            trace!(line, "Ignoring header line without a colon");
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.insert(name.to_ascii_lowercase(), value.to_string());
    }
    Ok(headers)
}

fn content_length(headers: &HashMap<String, String>) -> ProtocolResult<usize> {
    let value = headers
        .get(CONTENT_LENGTH)
        .ok_or(ProtocolError::MissingContentLength)?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidContentLength(value.clone()));
    }
    value
        .parse()
        .map_err(|_| ProtocolError::InvalidContentLength(value.clone()))
}

/// Writes framed messages to a byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    /// Creates a new FrameWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Validates, serializes and writes a single message.
    ///
    /// Nothing is written if the message is rejected.
    pub fn write_message(&mut self, message: &Message) -> ProtocolResult<()> {
        let data = encode_message(message)?;
        self.writer.write_all(&data)?;
        Ok(())
    }

    /// Writes an already serialized body with its header block.
    pub fn write_body(&mut self, body: &str) -> ProtocolResult<()> {
        self.writer.write_all(&frame_body(body))?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> ProtocolResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwraps this FrameWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
