//! Recursive-descent JSON scanner shared by the decoder, the encoder and the
//! parameter tree builder.
//!
//! The scanner works over a borrowed text buffer and a byte cursor. It never
//! builds a document model; callers pick the pieces they need (a decoded
//! string, a number token, the raw slice of a value) and skip the rest.
//!
//! Two strictness levels exist:
//!
//! - [`Strictness::Lenient`] is used on input. Numbers may carry a leading
//!   `+`, leading zeros are not special-cased and exponents are never
//!   consumed. Raw control characters inside strings are accepted.
//! - [`Strictness::Strict`] is used on fragments about to be emitted and on
//!   parameter trees. Numbers follow
//!   `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?` and strings must escape
//!   every control character below 0x20.
//!
//! `\uXXXX` escapes above 0x7F decode to [`NON_ASCII_PLACEHOLDER`] rather
//! than the real code point.

use std::fmt;

use thiserror::Error;

/// Character substituted for `\u` escapes outside the ASCII range.
pub const NON_ASCII_PLACEHOLDER: char = '?';

/// Maximum depth of nested objects/arrays accepted by the scanner.
pub const MAX_NESTING_DEPTH: usize = 512;

/// How forgiving the scanner is about number and string syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Accept the looser input forms produced by sloppy peers.
    Lenient,
    /// Enforce the JSON grammar exactly.
    Strict,
}

/// What went wrong while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarErrorKind {
    /// Input ended where a value or separator was required.
    UnexpectedEnd,
    /// A specific structural character was required.
    Expected(char),
    /// A string has no closing quote.
    UnterminatedString,
    /// Backslash followed by an unknown escape letter.
    InvalidEscape,
    /// `\u` not followed by four hex digits.
    InvalidUnicodeEscape,
    /// Raw control character inside a string (strict mode).
    ControlCharacter,
    /// Token does not follow the number grammar.
    InvalidNumber,
    /// Token starting like `true`/`false`/`null` but not matching it.
    InvalidLiteral,
    /// Objects/arrays nested deeper than [`MAX_NESTING_DEPTH`].
    NestingTooDeep,
    /// Non-whitespace after a complete value.
    TrailingCharacters,
}

impl fmt::Display for GrammarErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::Expected(c) => write!(f, "expected {c:?}"),
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::InvalidUnicodeEscape => write!(f, "invalid \\u escape"),
            Self::ControlCharacter => write!(f, "unescaped control character in string"),
            Self::InvalidNumber => write!(f, "invalid number"),
            Self::InvalidLiteral => write!(f, "invalid literal"),
            Self::NestingTooDeep => write!(f, "nesting deeper than {MAX_NESTING_DEPTH} levels"),
            Self::TrailingCharacters => write!(f, "trailing characters after value"),
        }
    }
}

/// A grammar fault and the byte offset where it was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct GrammarError {
    pub kind: GrammarErrorKind,
    pub offset: usize,
}

impl GrammarError {
    pub fn new(kind: GrammarErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Cursor over a JSON text.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    strictness: Strictness,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner positioned at the start of `text`.
    pub fn new(text: &'a str, strictness: Strictness) -> Self {
        Self {
            text,
            pos: 0,
            strictness,
        }
    }

    /// Scanner for incoming message bodies.
    pub fn lenient(text: &'a str) -> Self {
        Self::new(text, Strictness::Lenient)
    }

    /// Scanner for fragments that must be exact JSON.
    pub fn strict(text: &'a str) -> Self {
        Self::new(text, Strictness::Strict)
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// True once every byte has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Byte under the cursor, if any.
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    /// Builds an error located at the cursor.
    pub fn error(&self, kind: GrammarErrorKind) -> GrammarError {
        GrammarError::new(kind, self.pos)
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    /// Advances past space, tab, CR and LF.
    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Consumes `byte` if it is under the cursor.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes `byte` or fails without moving.
    pub fn expect(&mut self, byte: u8) -> Result<(), GrammarError> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.error(GrammarErrorKind::Expected(char::from(byte)))),
            None => Err(self.error(GrammarErrorKind::UnexpectedEnd)),
        }
    }

    /// Scans a string starting at the cursor and returns its decoded contents.
    pub fn scan_string(&mut self) -> Result<String, GrammarError> {
        let start = self.pos;
        let mut out = String::new();
        match self.string_inner(Some(&mut out)) {
            Ok(()) => Ok(out),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    /// Validates a string starting at the cursor without decoding it.
    pub fn skip_string(&mut self) -> Result<(), GrammarError> {
        let start = self.pos;
        self.string_inner(None).inspect_err(|_| self.pos = start)
    }

    fn string_inner(&mut self, mut out: Option<&mut String>) -> Result<(), GrammarError> {
        self.expect(b'"')?;
        let mut run_start = self.pos;
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.error(GrammarErrorKind::UnterminatedString));
            };
            match byte {
                b'"' => {
                    if let Some(out) = out.as_deref_mut() {
                        out.push_str(&self.text[run_start..self.pos]);
                    }
                    self.pos += 1;
                    return Ok(());
                }
                b'\\' => {
                    if let Some(out) = out.as_deref_mut() {
                        out.push_str(&self.text[run_start..self.pos]);
                    }
                    self.pos += 1;
                    let decoded = self.escape()?;
                    if let Some(out) = out.as_deref_mut() {
                        out.push(decoded);
                    }
                    run_start = self.pos;
                }
                b if b < 0x20 && self.strictness == Strictness::Strict => {
                    return Err(self.error(GrammarErrorKind::ControlCharacter));
                }
                _ => self.pos += 1,
            }
        }
    }

    // Cursor sits just past the backslash.
    fn escape(&mut self) -> Result<char, GrammarError> {
        let Some(letter) = self.peek() else {
            return Err(self.error(GrammarErrorKind::UnterminatedString));
        };
        let decoded = match letter {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                self.pos += 1;
                return self.unicode_escape();
            }
            _ => return Err(self.error(GrammarErrorKind::InvalidEscape)),
        };
        self.pos += 1;
        Ok(decoded)
    }

    fn unicode_escape(&mut self) -> Result<char, GrammarError> {
        let bytes = self.bytes();
        let Some(digits) = bytes.get(self.pos..self.pos + 4) else {
            return Err(self.error(GrammarErrorKind::InvalidUnicodeEscape));
        };
        let mut code = 0u32;
        for (offset, &digit) in digits.iter().enumerate() {
            let Some(value) = char::from(digit).to_digit(16) else {
                return Err(GrammarError::new(
                    GrammarErrorKind::InvalidUnicodeEscape,
                    self.pos + offset,
                ));
            };
            code = (code << 4) | value;
        }
        self.pos += 4;
        Ok(char::from_u32(code)
            .filter(char::is_ascii)
            .unwrap_or(NON_ASCII_PLACEHOLDER))
    }

    /// Consumes `literal` (`true`, `false` or `null`).
    pub fn scan_literal(&mut self, literal: &str) -> Result<(), GrammarError> {
        if self.bytes()[self.pos..].starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.error(GrammarErrorKind::InvalidLiteral))
        }
    }

    /// Scans a number token and returns its text.
    pub fn scan_number(&mut self) -> Result<&'a str, GrammarError> {
        let start = self.pos;
        let scanned = match self.strictness {
            Strictness::Lenient => self.lenient_number(),
            Strictness::Strict => self.strict_number(),
        };
        match scanned {
            Ok(()) => Ok(&self.text[start..self.pos]),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn lenient_number(&mut self) -> Result<(), GrammarError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut digits = self.digits();
        if self.eat(b'.') {
            digits += self.digits();
        }
        if digits == 0 {
            return Err(GrammarError::new(GrammarErrorKind::InvalidNumber, start));
        }
        Ok(())
    }

    fn strict_number(&mut self) -> Result<(), GrammarError> {
        self.eat(b'-');
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => {
                self.digits();
            }
            _ => return Err(self.error(GrammarErrorKind::InvalidNumber)),
        }
        if self.eat(b'.') && self.digits() == 0 {
            return Err(self.error(GrammarErrorKind::InvalidNumber));
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(self.error(GrammarErrorKind::InvalidNumber));
            }
        }
        Ok(())
    }

    /// Validates one value (after optional leading whitespace) and moves
    /// past it. On failure the cursor is left where it was.
    pub fn skip_value(&mut self) -> Result<(), GrammarError> {
        let start = self.pos;
        self.skip_value_at(0).inspect_err(|_| self.pos = start)
    }

    /// Like [`Scanner::skip_value`] but returns the exact slice of the value,
    /// without surrounding whitespace.
    pub fn scan_raw_value(&mut self) -> Result<&'a str, GrammarError> {
        let before = self.pos;
        self.skip_whitespace();
        let start = self.pos;
        match self.skip_value() {
            Ok(()) => Ok(&self.text[start..self.pos]),
            Err(err) => {
                self.pos = before;
                Err(err)
            }
        }
    }

    fn skip_value_at(&mut self, depth: usize) -> Result<(), GrammarError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error(GrammarErrorKind::UnexpectedEnd)),
            Some(b'"') => self.string_inner(None),
            Some(b'{') => self.skip_object(depth + 1),
            Some(b'[') => self.skip_array(depth + 1),
            Some(b't') => self.scan_literal("true"),
            Some(b'f') => self.scan_literal("false"),
            Some(b'n') => self.scan_literal("null"),
            Some(_) => self.scan_number().map(drop),
        }
    }

    /// Fails once `depth` exceeds [`MAX_NESTING_DEPTH`].
    pub fn check_depth(&self, depth: usize) -> Result<(), GrammarError> {
        if depth > MAX_NESTING_DEPTH {
            Err(self.error(GrammarErrorKind::NestingTooDeep))
        } else {
            Ok(())
        }
    }

    fn skip_object(&mut self, depth: usize) -> Result<(), GrammarError> {
        self.check_depth(depth)?;
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.eat(b'}') {
            return Ok(());
        }
        loop {
            self.string_inner(None)?;
            self.skip_whitespace();
            self.expect(b':')?;
            self.skip_value_at(depth)?;
            self.skip_whitespace();
            if self.eat(b',') {
                self.skip_whitespace();
                continue;
            }
            return self.expect(b'}');
        }
    }

    fn skip_array(&mut self, depth: usize) -> Result<(), GrammarError> {
        self.check_depth(depth)?;
        self.expect(b'[')?;
        self.skip_whitespace();
        if self.eat(b']') {
            return Ok(());
        }
        loop {
            self.skip_value_at(depth)?;
            self.skip_whitespace();
            if self.eat(b',') {
                continue;
            }
            return self.expect(b']');
        }
    }

    /// Skips trailing whitespace and requires the input to be exhausted.
    pub fn finish(&mut self) -> Result<(), GrammarError> {
        self.skip_whitespace();
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error(GrammarErrorKind::TrailingCharacters))
        }
    }
}

/// Checks that `text` holds exactly one JSON value, surrounded by nothing but
/// whitespace.
pub fn validate_complete_value(text: &str, strictness: Strictness) -> Result<(), GrammarError> {
    let mut scanner = Scanner::new(text, strictness);
    scanner.skip_whitespace();
    if scanner.is_at_end() {
        return Err(scanner.error(GrammarErrorKind::UnexpectedEnd));
    }
    scanner.skip_value()?;
    scanner.finish()
}

/// Boolean form of [`validate_complete_value`].
pub fn is_complete_json_value(text: &str, strictness: Strictness) -> bool {
    validate_complete_value(text, strictness).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_ok(text: &str) -> bool {
        is_complete_json_value(text, Strictness::Strict)
    }

    #[test]
    fn skip_whitespace_stops_at_content() {
        let mut scanner = Scanner::lenient(" \t\r\n x");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 5);
        assert_eq!(scanner.peek(), Some(b'x'));
    }

    #[test]
    fn scan_string_decodes_escapes() {
        let mut scanner = Scanner::lenient(r#""a\"b\\c\/d\b\f\n\r\t" rest"#);
        let value = scanner.scan_string().unwrap();
        assert_eq!(value, "a\"b\\c/d\u{8}\u{c}\n\r\t");
        assert_eq!(scanner.peek(), Some(b' '));
    }

    #[test]
    fn scan_string_maps_unicode_escapes() {
        let mut scanner = Scanner::lenient(r#""A\u00e9\u0007""#);
        assert_eq!(scanner.scan_string().unwrap(), "A?\u{7}");
    }

    #[test]
    fn scan_string_keeps_multibyte_text() {
        let mut scanner = Scanner::strict("\"héllo wörld\"");
        assert_eq!(scanner.scan_string().unwrap(), "héllo wörld");
    }

    #[test]
    fn scan_string_failures() {
        let cases = [
            ("\"abc", GrammarErrorKind::UnterminatedString),
            ("\"abc\\", GrammarErrorKind::UnterminatedString),
            (r#""\x""#, GrammarErrorKind::InvalidEscape),
            (r#""\u12G4""#, GrammarErrorKind::InvalidUnicodeEscape),
            (r#""\u12"#, GrammarErrorKind::InvalidUnicodeEscape),
            ("abc", GrammarErrorKind::Expected('"')),
        ];
        for (input, kind) in cases {
            let mut scanner = Scanner::lenient(input);
            let err = scanner.scan_string().unwrap_err();
            assert_eq!(err.kind, kind, "input {input:?}");
            assert_eq!(scanner.position(), 0, "cursor moved for {input:?}");
        }
    }

    #[test]
    fn control_characters_depend_on_strictness() {
        let text = "\"line\nbreak\"";
        assert!(Scanner::lenient(text).skip_string().is_ok());
        let err = Scanner::strict(text).skip_string().unwrap_err();
        assert_eq!(err.kind, GrammarErrorKind::ControlCharacter);
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn lenient_numbers() {
        for (input, token) in [
            ("+12,", "+12"),
            ("007}", "007"),
            ("-3.25 ", "-3.25"),
            ("1.", "1."),
            (".5", ".5"),
            ("2e10", "2"),
        ] {
            let mut scanner = Scanner::lenient(input);
            assert_eq!(scanner.scan_number().unwrap(), token, "input {input:?}");
        }
        for input in ["-", "+.", "abc", ""] {
            assert!(Scanner::lenient(input).scan_number().is_err(), "{input:?}");
        }
    }

    #[test]
    fn strict_numbers() {
        for input in ["0", "-0", "12", "-3.25", "1e5", "1E+5", "2.5e-3", "10"] {
            assert!(strict_ok(input), "{input:?} should be valid");
        }
        for input in ["01", "+1", "1.", ".5", "1e", "1e+", "-", "--1", "0x10"] {
            assert!(!strict_ok(input), "{input:?} should be invalid");
        }
    }

    #[test]
    fn skip_value_structures() {
        for input in [
            "{}",
            "[]",
            r#"{"a":1,"b":[true,false,null],"c":{"d":"e"}}"#,
            " [ 1 , { \"k\" : [ ] } ] ",
            "\"plain\"",
            "null",
        ] {
            assert!(strict_ok(input), "{input:?} should be valid");
        }
    }

    #[test]
    fn skip_value_rejects_malformed_structures() {
        for input in [
            r#"{"a":1,}"#,
            "[1,]",
            r#"{"a" 1}"#,
            r#"{a:1}"#,
            "[1 2]",
            "{",
            "[",
            "tru",
            "nul",
            "",
            "   ",
        ] {
            assert!(!strict_ok(input), "{input:?} should be invalid");
        }
    }

    #[test]
    fn skip_value_restores_cursor_on_failure() {
        let mut scanner = Scanner::strict(r#"  {"a":[1,2,}"#);
        let err = scanner.skip_value().unwrap_err();
        assert_eq!(scanner.position(), 0);
        assert_eq!(err.kind, GrammarErrorKind::InvalidNumber);
        assert_eq!(err.offset, 12);
    }

    #[test]
    fn scan_raw_value_returns_exact_slice() {
        let text = r#"  {"x": [1, 2]}  , "next""#;
        let mut scanner = Scanner::lenient(text);
        assert_eq!(scanner.scan_raw_value().unwrap(), r#"{"x": [1, 2]}"#);
        scanner.skip_whitespace();
        assert_eq!(scanner.peek(), Some(b','));
    }

    #[test]
    fn complete_value_rejects_trailing_garbage() {
        let err = validate_complete_value("{} x", Strictness::Strict).unwrap_err();
        assert_eq!(err, GrammarError::new(GrammarErrorKind::TrailingCharacters, 3));
        assert!(!strict_ok("1 2"));
        assert!(strict_ok(" {} \n"));
    }

    #[test]
    fn nesting_limit() {
        let deep_ok = format!("{}{}", "[".repeat(MAX_NESTING_DEPTH), "]".repeat(MAX_NESTING_DEPTH));
        assert!(strict_ok(&deep_ok));

        let too_deep = format!(
            "{}{}",
            "[".repeat(MAX_NESTING_DEPTH + 1),
            "]".repeat(MAX_NESTING_DEPTH + 1)
        );
        let err = validate_complete_value(&too_deep, Strictness::Strict).unwrap_err();
        assert_eq!(err.kind, GrammarErrorKind::NestingTooDeep);
    }

    #[test]
    fn error_display_includes_offset() {
        let err = GrammarError::new(GrammarErrorKind::Expected(':'), 7);
        assert_eq!(err.to_string(), "expected ':' at byte 7");
    }
}
