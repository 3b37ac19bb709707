//! Stdio server for the lspwire codec.
//!
//! A [`Session`] reads `Content-Length` framed JSON-RPC messages from one
//! stream, decodes and classifies them, records what it saw, and (when
//! enabled) writes each message back re-encoded to a second stream.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use lspwire_protocol::{encode_message, Message};
//! use lspwire_server::{ServerConfig, Session};
//!
//! let input = encode_message(&Message::notification("exit")).unwrap();
//! let mut session = Session::new(Cursor::new(input.clone()), Vec::new(), ServerConfig::default());
//! let stats = session.run().unwrap();
//! assert_eq!(stats.echoed, 1);
//! assert_eq!(session.output(), &input);
//! ```

pub mod cli;
mod config;
mod error;
mod session;

pub use cli::Cli;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use session::{Session, SessionStats};
