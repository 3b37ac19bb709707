//! Outgoing message validation and serialization.
//!
//! Encoding is all-or-nothing: the version, the field combination and every
//! raw fragment are checked before a single byte of output is produced.

use std::fmt::Write as _;

use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::grammar::{self, Strictness};
use crate::types::{Message, RawJson};
use crate::{CONTENT_TYPE, JSONRPC_VERSION};

/// Serializes a message to its JSON body, without framing.
///
/// Members are written in a fixed order: `jsonrpc`, `id`, `method`,
/// `params`, `result`, `error`.
///
/// # Example
///
/// ```rust
/// use lspwire_protocol::{serialize_message, Message};
///
/// let body = serialize_message(&Message::request(1, "ping")).unwrap();
/// assert_eq!(body, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
/// ```
pub fn serialize_message(message: &Message) -> ProtocolResult<String> {
    if !message.jsonrpc.is_v2() {
        return Err(ProtocolError::UnsupportedVersion(message.jsonrpc));
    }

    let kind = message.kind()?;

    validate_fragment("params", message.params.as_ref())?;
    validate_fragment("result", message.result.as_ref())?;
    validate_fragment("error", message.error.as_ref())?;

    let mut body = String::with_capacity(128);
    body.push('{');
    write_key(&mut body, "jsonrpc", false);
    write_escaped(&mut body, JSONRPC_VERSION);

    if let Some(id) = message.id {
        write_key(&mut body, "id", true);
        let _ = write!(body, "{id}");
    }
    if let Some(method) = &message.method {
        write_key(&mut body, "method", true);
        write_escaped(&mut body, method);
    }
    for (key, fragment) in [
        ("params", &message.params),
        ("result", &message.result),
        ("error", &message.error),
    ] {
        if let Some(fragment) = fragment {
            write_key(&mut body, key, true);
            body.push_str(fragment.as_str());
        }
    }
    body.push('}');

    debug!(%kind, len = body.len(), "Serialized message");
    Ok(body)
}

/// Serializes and frames a message, returning the complete wire bytes.
///
/// # Example
///
/// ```rust
/// use lspwire_protocol::{encode_message, Message};
///
/// let bytes = encode_message(&Message::notification("exit")).unwrap();
/// assert!(bytes.starts_with(b"Content-Length: 33\r\n"));
/// ```
pub fn encode_message(message: &Message) -> ProtocolResult<Vec<u8>> {
    let body = serialize_message(message)?;
    Ok(frame_body(&body))
}

/// Prefixes `body` with the `Content-Length`/`Content-Type` header block.
pub fn frame_body(body: &str) -> Vec<u8> {
    let header = format!(
        "Content-Length: {}\r\nContent-Type: {CONTENT_TYPE}\r\n\r\n",
        body.len()
    );
    let mut packet = Vec::with_capacity(header.len() + body.len());
    packet.extend_from_slice(header.as_bytes());
    packet.extend_from_slice(body.as_bytes());
    packet
}

fn validate_fragment(field: &'static str, fragment: Option<&RawJson>) -> ProtocolResult<()> {
    let Some(fragment) = fragment else {
        return Ok(());
    };
    grammar::validate_complete_value(fragment.as_str(), Strictness::Strict)
        .map_err(|source| ProtocolError::InvalidFragment { field, source })
}

fn write_key(out: &mut String, key: &str, separator: bool) {
    if separator {
        out.push(',');
    }
    write_escaped(out, key);
    out.push(':');
}

/// Appends `value` as a quoted JSON string.
///
/// Quote, backslash and control characters below 0x20 are escaped;
/// everything else, including multi-byte characters, is copied as is.
pub fn write_escaped(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
