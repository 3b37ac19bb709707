//! Human-readable rendering of parameter trees for diagnostics.

use std::fmt::{self, Write};

use crate::params::{ParameterTree, ParameterValue};

const INDENT: &str = "  ";

/// Renders `tree` as an indented, multi-line block.
///
/// Keys are written bare, strings are quoted without escaping, and array
/// elements are separated by trailing commas.
pub fn render_tree(tree: &ParameterTree) -> String {
    tree.to_string()
}

impl fmt::Display for ParameterTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(f, self.fields().iter(), 0)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

fn write_indent(out: &mut impl Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        out.write_str(INDENT)?;
    }
    Ok(())
}

fn write_value(out: &mut impl Write, value: &ParameterValue, depth: usize) -> fmt::Result {
    match value {
        ParameterValue::Null => out.write_str("null"),
        ParameterValue::Boolean(b) => write!(out, "{b}"),
        ParameterValue::Number(n) => write!(out, "{n}"),
        ParameterValue::String(s) => write!(out, "\"{s}\""),
        ParameterValue::Object(map) => write_object(out, map.iter(), depth),
        ParameterValue::Array(items) => write_array(out, items, depth),
    }
}

fn write_object<'a>(
    out: &mut impl Write,
    entries: impl Iterator<Item = (&'a String, &'a ParameterValue)>,
    depth: usize,
) -> fmt::Result {
    out.write_str("{\n")?;
    for (key, value) in entries {
        write_indent(out, depth + 1)?;
        write!(out, "{key}: ")?;
        write_value(out, value, depth + 1)?;
        out.write_char('\n')?;
    }
    write_indent(out, depth)?;
    out.write_char('}')
}

fn write_array(out: &mut impl Write, items: &[ParameterValue], depth: usize) -> fmt::Result {
    out.write_str("[\n")?;
    for (i, item) in items.iter().enumerate() {
        write_indent(out, depth + 1)?;
        write_value(out, item, depth + 1)?;
        if i + 1 < items.len() {
            out.write_char(',')?;
        }
        out.write_char('\n')?;
    }
    write_indent(out, depth)?;
    out.write_char(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn renders_nested_tree() {
        let tree = ParameterTree::parse(
            r#"{"textDocument":{"uri":"file:///tmp/a.rs","version":3},
                "position":{"line":10,"character":4.5},
                "context":{"includeDeclaration":true,"extra":null},
                "items":[1,"two",[],{}]}"#,
        )
        .unwrap();

        assert_snapshot!(render_tree(&tree), @r#"
        {
          context: {
            extra: null
            includeDeclaration: true
          }
          items: [
            1,
            "two",
            [
            ],
            {
            }
          ]
          position: {
            character: 4.5
            line: 10
          }
          textDocument: {
            uri: "file:///tmp/a.rs"
            version: 3
          }
        }
        "#);
    }

    #[test]
    fn renders_empty_tree() {
        let tree = ParameterTree::default();
        assert_eq!(render_tree(&tree), "{\n}");
    }

    #[test]
    fn renders_scalars() {
        assert_eq!(ParameterValue::Number(-0.25).to_string(), "-0.25");
        assert_eq!(ParameterValue::Number(1e21).to_string(), "1000000000000000000000");
        assert_eq!(ParameterValue::String("a\"b".into()).to_string(), "\"a\"b\"");
        assert_eq!(ParameterValue::Boolean(false).to_string(), "false");
        assert_eq!(ParameterValue::Null.to_string(), "null");
    }

    #[test]
    fn value_display_matches_nested_rendering() {
        let tree = ParameterTree::parse(r#"{"a":[true]}"#).unwrap();
        let value = tree.get("a").unwrap();
        assert_eq!(value.to_string(), "[\n  true\n]");
    }
}
