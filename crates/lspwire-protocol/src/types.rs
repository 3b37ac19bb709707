//! Message record and the small value types it is built from.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use thiserror::Error;

use crate::error::ProtocolError;
use crate::grammar::{self, GrammarError, Strictness};

/// Largest number of fractional digits a [`Version`] may carry.
pub const MAX_VERSION_SCALE: u32 = 18;

/// Exact decimal protocol version.
///
/// Stored as `units / 10^scale` with trailing fractional zeros stripped, so
/// `2`, `2.0` and `"2.00"` all compare equal to [`Version::V2`] without any
/// floating point involved. At most [`MAX_VERSION_SCALE`] fractional digits
/// are kept; anything finer is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    units: i64,
    scale: u32,
}

impl Version {
    /// JSON-RPC 2.0.
    pub const V2: Version = Version { units: 2, scale: 0 };

    /// Parses a decimal like `2`, `2.0`, `+2.`, `.5` or `20e-1`.
    pub fn parse(text: &str) -> Option<Version> {
        let bytes = text.as_bytes();
        let mut i = 0;
        let negative = match bytes.first() {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };

        let mut units: i64 = 0;
        let mut scale: i64 = 0;
        let mut digits = 0;
        while let Some(&(d @ b'0'..=b'9')) = bytes.get(i) {
            units = units.checked_mul(10)?.checked_add(i64::from(d - b'0'))?;
            digits += 1;
            i += 1;
        }
        if bytes.get(i) == Some(&b'.') {
            i += 1;
            // Zeros are only materialized once a non-zero digit follows them.
            let mut pending_zeros = 0;
            while let Some(&(d @ b'0'..=b'9')) = bytes.get(i) {
                digits += 1;
                i += 1;
                if d == b'0' {
                    pending_zeros += 1;
                    continue;
                }
                for _ in 0..pending_zeros {
                    units = units.checked_mul(10)?;
                }
                units = units.checked_mul(10)?.checked_add(i64::from(d - b'0'))?;
                scale += pending_zeros + 1;
                pending_zeros = 0;
            }
        }
        if digits == 0 {
            return None;
        }

        if matches!(bytes.get(i), Some(b'e' | b'E')) {
            i += 1;
            let exp_negative = match bytes.get(i) {
                Some(b'-') => {
                    i += 1;
                    true
                }
                Some(b'+') => {
                    i += 1;
                    false
                }
                _ => false,
            };
            let mut exponent: i64 = 0;
            let exp_start = i;
            while let Some(&(d @ b'0'..=b'9')) = bytes.get(i) {
                exponent = exponent.checked_mul(10)?.checked_add(i64::from(d - b'0'))?;
                i += 1;
            }
            if i == exp_start {
                return None;
            }
            scale = if exp_negative {
                scale.checked_add(exponent)?
            } else {
                scale.checked_sub(exponent)?
            };
        }
        if i != bytes.len() {
            return None;
        }

        if units == 0 {
            scale = 0;
        }
        while scale > 0 && units % 10 == 0 {
            units /= 10;
            scale -= 1;
        }
        while scale < 0 {
            units = units.checked_mul(10)?;
            scale += 1;
        }
        let scale = u32::try_from(scale)
            .ok()
            .filter(|&scale| scale <= MAX_VERSION_SCALE)?;
        Some(Version {
            units: if negative { -units } else { units },
            scale,
        })
    }

    /// True for exactly 2.0.
    pub fn is_v2(&self) -> bool {
        *self == Self::V2
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::V2
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.units < 0 {
            f.write_char('-')?;
        }
        let digits = self.units.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{digits}.0");
        }
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            return write!(f, "{int}.{frac}");
        }
        f.write_str("0.")?;
        for _ in digits.len()..scale {
            f.write_char('0')?;
        }
        f.write_str(&digits)
    }
}

impl FromStr for Version {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s).ok_or_else(|| ProtocolError::InvalidVersion(s.to_string()))
    }
}

/// An uninterpreted JSON fragment (`params`, `result` or `error`).
///
/// The decoder only ever stores the exact slice it validated. Values built
/// by callers are not checked until the message is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawJson(String);

impl RawJson {
    /// Wraps `text` without validating it.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Wraps `text` after checking it is exactly one strict JSON value.
    pub fn parse(text: impl Into<String>) -> Result<Self, GrammarError> {
        let text = text.into();
        grammar::validate_complete_value(&text, Strictness::Strict)?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True if the fragment is one complete strict JSON value.
    pub fn is_complete(&self) -> bool {
        grammar::is_complete_json_value(&self.0, Strictness::Strict)
    }
}

impl fmt::Display for RawJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RawJson {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawJson {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawJson {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// The four valid JSON-RPC message shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Request,
    Notification,
    SuccessResponse,
    ErrorResponse,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Notification => "notification",
            Self::SuccessResponse => "success response",
            Self::ErrorResponse => "error response",
        }
    }

    /// True for both response kinds.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::SuccessResponse | Self::ErrorResponse)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message's populated fields do not form a valid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("result and error are mutually exclusive")]
    ResultWithError,
    #[error("params present without method")]
    ParamsWithoutMethod,
    #[error("method present alongside result or error")]
    MethodWithResponse,
    #[error("response without id")]
    ResponseWithoutId,
    #[error("no method, result or error")]
    NoPayload,
}

/// One JSON-RPC message, incoming or outgoing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Protocol version; must be 2.0 to be encoded.
    pub jsonrpc: Version,
    /// Absent for notifications. A JSON `null` id decodes as absent.
    pub id: Option<i32>,
    pub method: Option<String>,
    pub params: Option<RawJson>,
    pub result: Option<RawJson>,
    pub error: Option<RawJson>,
}

impl Message {
    /// Creates a message with every optional field empty.
    pub fn new(jsonrpc: Version) -> Self {
        Self {
            jsonrpc,
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    /// Creates a request.
    pub fn request(id: i32, method: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            method: Some(method.into()),
            ..Self::new(Version::V2)
        }
    }

    /// Creates a notification.
    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            ..Self::new(Version::V2)
        }
    }

    /// Creates a success response.
    pub fn success(id: i32, result: impl Into<RawJson>) -> Self {
        Self {
            id: Some(id),
            result: Some(result.into()),
            ..Self::new(Version::V2)
        }
    }

    /// Creates an error response.
    pub fn failure(id: i32, error: impl Into<RawJson>) -> Self {
        Self {
            id: Some(id),
            error: Some(error.into()),
            ..Self::new(Version::V2)
        }
    }

    /// Builder: set params.
    #[must_use]
    pub fn with_params(mut self, params: impl Into<RawJson>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Classifies the message by which optional fields are populated.
    pub fn kind(&self) -> Result<MessageKind, ShapeError> {
        let has_id = self.id.is_some();
        let has_method = self.method.is_some();
        let has_result = self.result.is_some();
        let has_error = self.error.is_some();

        if has_result && has_error {
            return Err(ShapeError::ResultWithError);
        }
        if self.params.is_some() && !has_method {
            return Err(ShapeError::ParamsWithoutMethod);
        }
        if has_method && (has_result || has_error) {
            return Err(ShapeError::MethodWithResponse);
        }

        match (has_id, has_method, has_result, has_error) {
            (true, true, _, _) => Ok(MessageKind::Request),
            (false, true, _, _) => Ok(MessageKind::Notification),
            (true, false, true, false) => Ok(MessageKind::SuccessResponse),
            (true, false, false, true) => Ok(MessageKind::ErrorResponse),
            (false, false, true, _) | (false, false, _, true) => Err(ShapeError::ResponseWithoutId),
            _ => Err(ShapeError::NoPayload),
        }
    }

    /// True if the populated fields match exactly one valid shape.
    pub fn has_valid_message_shape(&self) -> bool {
        self.kind().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_equivalent_forms() {
        for text in ["2", "2.0", "2.000", "+2.", "20e-1", "0.2E1", "2.0e0"] {
            assert_eq!(Version::parse(text), Some(Version::V2), "{text:?}");
        }
    }

    #[test]
    fn version_rejects_non_numbers() {
        for text in ["", "two", "2.0.0", "2 ", " 2", ".", "-", "2e", "0x2", "1e999999999999999999"] {
            assert_eq!(Version::parse(text), None, "{text:?}");
        }
    }

    #[test]
    fn version_is_exact() {
        assert!(!Version::parse("2.0000001").unwrap().is_v2());
        assert!(!Version::parse("1.9999999999").unwrap().is_v2());
        assert!(Version::parse("2.00000000000000000000000000").unwrap().is_v2());
    }

    #[test]
    fn version_display() {
        assert_eq!(Version::V2.to_string(), "2.0");
        assert_eq!(Version::parse("1.25").unwrap().to_string(), "1.25");
        assert_eq!(Version::parse("0.05").unwrap().to_string(), "0.05");
        assert_eq!(Version::parse("-3").unwrap().to_string(), "-3.0");
        assert_eq!(Version::parse("150e-1").unwrap().to_string(), "15.0");
        assert_eq!(Version::parse("-0.5").unwrap().to_string(), "-0.5");
        assert_eq!(
            Version::parse("1e-18").unwrap().to_string(),
            "0.000000000000000001"
        );
    }

    #[test]
    fn version_scale_is_bounded() {
        assert!(Version::parse("123e-18").is_some());
        for text in ["1e-19", "1e-70000", "1e-50000000", "0.0000000000000000001"] {
            assert_eq!(Version::parse(text), None, "{text:?}");
        }
        // Zero and trailing zeros never count towards the scale.
        assert_eq!(Version::parse("0e-70000"), Some(Version { units: 0, scale: 0 }));
        assert!(Version::parse("2.000000000000000000000000").unwrap().is_v2());
    }

    #[test]
    fn version_from_str_error() {
        let err = "abc".parse::<Version>().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidVersion(ref s) if s == "abc"));
    }

    #[test]
    fn raw_json_parse_validates() {
        assert!(RawJson::parse(r#"{"a":1}"#).is_ok());
        assert!(RawJson::parse("{} {}").is_err());
        assert!(!RawJson::new("[1,").is_complete());
        assert_eq!(RawJson::from("null").as_str(), "null");
    }

    #[test]
    fn constructors_produce_valid_shapes() {
        assert_eq!(Message::request(1, "initialize").kind(), Ok(MessageKind::Request));
        assert_eq!(
            Message::notification("initialized").with_params("{}").kind(),
            Ok(MessageKind::Notification)
        );
        assert_eq!(Message::success(1, "null").kind(), Ok(MessageKind::SuccessResponse));
        assert_eq!(
            Message::failure(1, r#"{"code":-32601,"message":"nope"}"#).kind(),
            Ok(MessageKind::ErrorResponse)
        );
    }

    #[test]
    fn shape_rejections() {
        let mut both = Message::success(1, "1");
        both.error = Some(RawJson::from("2"));
        assert_eq!(both.kind(), Err(ShapeError::ResultWithError));

        let mut params_only = Message::new(Version::V2);
        params_only.id = Some(3);
        params_only.params = Some(RawJson::from("[]"));
        assert_eq!(params_only.kind(), Err(ShapeError::ParamsWithoutMethod));

        let mut mixed = Message::request(1, "x");
        mixed.result = Some(RawJson::from("1"));
        assert_eq!(mixed.kind(), Err(ShapeError::MethodWithResponse));

        let mut anonymous = Message::new(Version::V2);
        anonymous.result = Some(RawJson::from("1"));
        assert_eq!(anonymous.kind(), Err(ShapeError::ResponseWithoutId));

        let mut bare = Message::new(Version::V2);
        assert_eq!(bare.kind(), Err(ShapeError::NoPayload));
        bare.id = Some(1);
        assert!(!bare.has_valid_message_shape());
    }
}
