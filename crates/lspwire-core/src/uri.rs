//! Conversion between `file:` URIs and filesystem paths.
//!
//! Editors identify documents by URI (`file:///home/me/src/main.rs`,
//! `file:///C:/proj/main.rs`, `file://server/share/main.rs`). These helpers
//! map such URIs to paths and back. Windows drive (`C:\...`) and UNC
//! (`\\server\share\...`) forms are recognized on every platform, so a
//! server on one OS can still make sense of paths from another.

use std::fmt;
use std::io;
use std::path::{MAIN_SEPARATOR, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use url::Url;

const FILE_SCHEME: &str = "file";
const LOCALHOST: &str = "localhost";

/// Errors from URI parsing and path conversion.
#[derive(Debug, Error)]
pub enum UriError {
    #[error("invalid URI: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported URI scheme: {0:?}")]
    UnsupportedScheme(String),

    #[error("file URI must not carry a query or fragment")]
    QueryOrFragment,

    #[error("malformed percent escape in {0:?}")]
    MalformedEscape(String),

    #[error("decoded path is not valid UTF-8")]
    NonUtf8,

    #[error("empty path")]
    EmptyPath,

    #[error("invalid UNC path: {0:?}")]
    InvalidUnc(String),

    #[error("failed to resolve absolute path: {0}")]
    Io(#[from] io::Error),
}

/// A URI split into its components. `path` is kept percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUri {
    pub scheme: String,
    pub authority: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl FileUri {
    /// A `file:` URI with no authority, query or fragment.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            scheme: FILE_SCHEME.to_string(),
            authority: None,
            path: path.into(),
            query: None,
            fragment: None,
        }
    }

    /// Parses an absolute URI.
    pub fn parse(text: &str) -> Result<Self, UriError> {
        let url = Url::parse(text)?;
        Ok(Self {
            scheme: url.scheme().to_string(),
            authority: url.host_str().filter(|h| !h.is_empty()).map(str::to_string),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        })
    }

    pub fn is_file(&self) -> bool {
        self.scheme.eq_ignore_ascii_case(FILE_SCHEME)
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if self.authority.is_some() || self.is_file() {
            write!(f, "//{}", self.authority.as_deref().unwrap_or_default())?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Maps a `file:` URI to a local path.
///
/// An authority other than `localhost` becomes a UNC prefix. A leading
/// `/C:` drive segment loses its slash. Separators are converted to the
/// platform separator.
pub fn uri_to_path(uri: &FileUri) -> Result<PathBuf, UriError> {
    if !uri.is_file() {
        return Err(UriError::UnsupportedScheme(uri.scheme.clone()));
    }
    if uri.query.is_some() || uri.fragment.is_some() {
        return Err(UriError::QueryOrFragment);
    }

    let decoded = percent_decode(&uri.path)?;

    let path = match uri.authority.as_deref() {
        Some(host) if !host.is_empty() && host != LOCALHOST => {
            if !decoded.starts_with('/') {
                return Err(UriError::InvalidUnc(decoded));
            }
            format!("//{host}{decoded}")
        }
        _ if is_drive_uri_path(&decoded) => decoded[1..].to_string(),
        _ => decoded,
    };

    Ok(PathBuf::from(to_native_separators(path)))
}

/// Maps a path to a `file:` URI.
///
/// A trailing `#fragment` and then `?query` are split off and carried into
/// the URI. Relative paths are resolved against the current directory.
pub fn path_to_uri(path: &str) -> Result<FileUri, UriError> {
    let (rest, fragment) = split_suffix(path, '#');
    let (raw, query) = split_suffix(rest, '?');
    if raw.is_empty() {
        return Err(UriError::EmptyPath);
    }

    let mut uri = FileUri::local(String::new());
    uri.query = query;
    uri.fragment = fragment;

    if let Some(unc) = raw.strip_prefix(r"\\") {
        let Some(host_end) = unc.find(['\\', '/']).filter(|&end| end > 0) else {
            return Err(UriError::InvalidUnc(raw.to_string()));
        };
        uri.authority = Some(unc[..host_end].to_string());
        uri.path = percent_encode_path(&unc[host_end..].replace('\\', "/"));
        return Ok(uri);
    }

    let native = if has_drive_prefix(raw) {
        raw.to_string()
    } else {
        let absolute = std::path::absolute(raw)?;
        absolute.to_str().ok_or(UriError::NonUtf8)?.to_string()
    };

    let mut normalized = native.replace('\\', "/");
    if has_drive_prefix(&normalized) {
        normalized.insert(0, '/');
    }
    uri.path = percent_encode_path(&normalized);
    Ok(uri)
}

fn split_suffix(text: &str, marker: char) -> (&str, Option<String>) {
    match text.split_once(marker) {
        Some((head, tail)) => (head, Some(tail.to_string())),
        None => (text, None),
    }
}

/// `C:` at the start of a native path.
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// `/C:` at the start of a URI path.
fn is_drive_uri_path(path: &str) -> bool {
    path.strip_prefix('/').is_some_and(has_drive_prefix)
}

fn to_native_separators(path: String) -> String {
    if MAIN_SEPARATOR == '/' {
        path
    } else {
        path.replace('/', &MAIN_SEPARATOR.to_string())
    }
}

fn percent_decode(text: &str) -> Result<String, UriError> {
    let bytes = text.as_bytes();
    for (i, _) in text.match_indices('%') {
        let well_formed = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(UriError::MalformedEscape(text.to_string()));
        }
    }
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| UriError::NonUtf8)
}

/// Bytes escaped in a URI path: everything except RFC 3986 `pchar` and `/`.
const PATH_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/');

fn percent_encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ESCAPES).to_string()
}
