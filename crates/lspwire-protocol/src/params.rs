//! Generic parameter trees.
//!
//! A [`ParameterTree`] is a fully materialized copy of a `params` object,
//! for callers that want to inspect parameters without a typed schema.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ProtocolError, ProtocolResult};
use crate::grammar::{GrammarError, GrammarErrorKind, Scanner};

/// One node of a parameter tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Object(BTreeMap<String, ParameterValue>),
    Array(Vec<ParameterValue>),
}

impl ParameterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ParameterValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ParameterValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// JSON type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

/// A parsed `params` object.
///
/// Keys are kept sorted; when a key appears more than once the last value
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterTree {
    fields: BTreeMap<String, ParameterValue>,
}

impl ParameterTree {
    /// Parses exactly one JSON object, surrounded by nothing but whitespace.
    ///
    /// Strings and numbers follow the strict grammar. Numbers are stored as
    /// `f64`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lspwire_protocol::ParameterTree;
    ///
    /// let tree = ParameterTree::parse(r#"{"textDocument":{"uri":"file:///a.rs"}}"#).unwrap();
    /// let uri = tree.lookup(&["textDocument", "uri"]).and_then(|v| v.as_str());
    /// assert_eq!(uri, Some("file:///a.rs"));
    /// ```
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        let mut scanner = Scanner::strict(text);
        scanner.skip_whitespace();
        match scanner.peek() {
            Some(b'{') => {}
            Some(_) => return Err(ProtocolError::NotAnObject),
            None => return Err(scanner.error(GrammarErrorKind::UnexpectedEnd).into()),
        }
        let fields = parse_object(&mut scanner, 1)?;
        scanner.finish()?;
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.fields.get(key)
    }

    /// Follows a chain of object keys from the top level.
    pub fn lookup(&self, path: &[&str]) -> Option<&ParameterValue> {
        let (first, rest) = path.split_first()?;
        let mut value = self.fields.get(*first)?;
        for key in rest {
            value = value.as_object()?.get(*key)?;
        }
        Some(value)
    }

    pub fn fields(&self) -> &BTreeMap<String, ParameterValue> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> BTreeMap<String, ParameterValue> {
        self.fields
    }
}

/// Free-function form of [`ParameterTree::parse`].
pub fn build_parameter_tree(text: &str) -> ProtocolResult<ParameterTree> {
    ParameterTree::parse(text)
}

fn parse_value(scanner: &mut Scanner<'_>, depth: usize) -> Result<ParameterValue, GrammarError> {
    scanner.skip_whitespace();
    match scanner.peek() {
        None => Err(scanner.error(GrammarErrorKind::UnexpectedEnd)),
        Some(b'"') => scanner.scan_string().map(ParameterValue::String),
        Some(b'{') => parse_object(scanner, depth + 1).map(ParameterValue::Object),
        Some(b'[') => parse_array(scanner, depth + 1).map(ParameterValue::Array),
        Some(b't') => scanner.scan_literal("true").map(|()| ParameterValue::Boolean(true)),
        Some(b'f') => scanner.scan_literal("false").map(|()| ParameterValue::Boolean(false)),
        Some(b'n') => scanner.scan_literal("null").map(|()| ParameterValue::Null),
        Some(_) => {
            let start = scanner.position();
            let token = scanner.scan_number()?;
            token
                .parse()
                .map(ParameterValue::Number)
                .map_err(|_| GrammarError::new(GrammarErrorKind::InvalidNumber, start))
        }
    }
}

fn parse_object(
    scanner: &mut Scanner<'_>,
    depth: usize,
) -> Result<BTreeMap<String, ParameterValue>, GrammarError> {
    scanner.check_depth(depth)?;
    scanner.expect(b'{')?;
    let mut fields = BTreeMap::new();
    scanner.skip_whitespace();
    if scanner.eat(b'}') {
        return Ok(fields);
    }
    loop {
        scanner.skip_whitespace();
        let key = scanner.scan_string()?;
        scanner.skip_whitespace();
        scanner.expect(b':')?;
        let value = parse_value(scanner, depth)?;
        fields.insert(key, value);
        scanner.skip_whitespace();
        if scanner.eat(b',') {
            continue;
        }
        scanner.expect(b'}')?;
        return Ok(fields);
    }
}

fn parse_array(
    scanner: &mut Scanner<'_>,
    depth: usize,
) -> Result<Vec<ParameterValue>, GrammarError> {
    scanner.check_depth(depth)?;
    scanner.expect(b'[')?;
    let mut items = Vec::new();
    scanner.skip_whitespace();
    if scanner.eat(b']') {
        return Ok(items);
    }
    loop {
        items.push(parse_value(scanner, depth)?);
        scanner.skip_whitespace();
        if scanner.eat(b',') {
            continue;
        }
        scanner.expect(b']')?;
        return Ok(items);
    }
}
