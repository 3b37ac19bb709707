//! JSON-RPC framing and codec for lspwire.
//!
//! This crate turns a byte stream carrying `Content-Length` framed JSON-RPC
//! 2.0 messages into [`Message`] records, and turns records back into wire
//! bytes.
//!
//! # Layers
//!
//! - [`grammar`]: a recursive-descent JSON scanner with lenient (input) and
//!   strict (output) modes;
//! - [`FrameReader`] / [`FrameWriter`]: header framing over `Read`/`Write`;
//! - [`decode_message`]: JSON body to [`Message`], keeping `params`, `result`
//!   and `error` as raw fragments;
//! - [`encode_message`]: shape and fragment validation, then serialization
//!   and framing;
//! - [`ParameterTree`]: a generic tree built from a `params` fragment, with a
//!   multi-line [`Display`](std::fmt::Display) rendering.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use lspwire_protocol::{decode_message, encode_message, FrameReader, Message};
//!
//! let bytes = encode_message(&Message::request(1, "ping")).unwrap();
//! let mut reader = FrameReader::new(Cursor::new(bytes));
//! let body = reader.read_message().unwrap().unwrap();
//! let message = decode_message(&body).unwrap();
//! assert_eq!(message.method.as_deref(), Some("ping"));
//! ```

mod decode;
mod encode;
mod error;
mod framing;
pub mod grammar;
mod params;
mod pretty;
mod types;

pub use decode::decode_message;
pub use encode::{encode_message, frame_body, serialize_message};
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{DEFAULT_CHUNK_SIZE, FrameReader, FrameWriter, MAX_CHUNK_SIZE};
pub use grammar::{GrammarError, GrammarErrorKind, Strictness, is_complete_json_value};
pub use params::{ParameterTree, ParameterValue, build_parameter_tree};
pub use pretty::render_tree;
pub use types::{MAX_VERSION_SCALE, Message, MessageKind, RawJson, ShapeError, Version};

/// The only protocol version this crate emits.
pub const JSONRPC_VERSION: &str = "2.0";

/// Default upper bound for a single message body (64 MiB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// `Content-Type` written on every outgoing message.
pub const CONTENT_TYPE: &str = "application/vscode-jsonrpc; charset=utf-8";
