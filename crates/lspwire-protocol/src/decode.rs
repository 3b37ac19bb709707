//! Incoming message decoding.
//!
//! The decoder walks the top-level object once, in source order, and only
//! interprets the members the protocol cares about. `params`, `result` and
//! `error` are validated and kept as raw slices; everything else is
//! validated and dropped.

use tracing::trace;

use crate::error::{ProtocolError, ProtocolResult};
use crate::grammar::{GrammarErrorKind, Scanner};
use crate::types::{Message, RawJson, Version};

/// Decodes one message body into a [`Message`].
///
/// # Errors
///
/// - [`ProtocolError::BatchNotSupported`] for a top-level array;
/// - [`ProtocolError::NotAnObject`] for any other non-object value;
/// - [`ProtocolError::Grammar`] for malformed JSON or trailing characters;
/// - [`ProtocolError::MissingVersion`], [`ProtocolError::InvalidVersion`] and
///   [`ProtocolError::InvalidId`] for bad protocol members.
///
/// # Example
///
/// ```rust
/// use lspwire_protocol::{decode_message, Version};
///
/// let message = decode_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
/// assert_eq!(message.jsonrpc, Version::V2);
/// assert_eq!(message.id, Some(1));
/// assert_eq!(message.method.as_deref(), Some("ping"));
/// assert!(message.params.is_none());
/// ```
pub fn decode_message(text: &str) -> ProtocolResult<Message> {
    let mut scanner = Scanner::lenient(text);
    scanner.skip_whitespace();
    match scanner.peek() {
        Some(b'{') => {}
        Some(b'[') => return Err(ProtocolError::BatchNotSupported),
        Some(_) => return Err(ProtocolError::NotAnObject),
        None => {
            return Err(scanner.error(GrammarErrorKind::UnexpectedEnd).into());
        }
    }
    scanner.expect(b'{')?;

    let mut jsonrpc = None;
    let mut message = Message::new(Version::V2);

    loop {
        scanner.skip_whitespace();
        // Also accepts a trailing comma before the closing brace.
        if scanner.eat(b'}') {
            break;
        }

        let key = scanner.scan_string()?;
        scanner.skip_whitespace();
        scanner.expect(b':')?;
        scanner.skip_whitespace();

        match key.as_str() {
            "jsonrpc" => jsonrpc = Some(decode_version(&mut scanner)?),
            "id" => {
                if let Some(id) = decode_id(&mut scanner)? {
                    message.id = Some(id);
                }
            }
            "method" => message.method = Some(scanner.scan_string()?),
            "params" => message.params = Some(RawJson::new(scanner.scan_raw_value()?)),
            "result" => message.result = Some(RawJson::new(scanner.scan_raw_value()?)),
            "error" => message.error = Some(RawJson::new(scanner.scan_raw_value()?)),
            other => {
                trace!(key = other, "Skipping unknown member");
                scanner.skip_value()?;
            }
        }

        scanner.skip_whitespace();
        if scanner.eat(b',') {
            continue;
        }
        scanner.expect(b'}')?;
        break;
    }

    scanner.finish()?;

    message.jsonrpc = jsonrpc.ok_or(ProtocolError::MissingVersion)?;
    Ok(message)
}

/// `jsonrpc` may be written as a string or a bare number.
fn decode_version(scanner: &mut Scanner<'_>) -> ProtocolResult<Version> {
    if scanner.peek() == Some(b'"') {
        let text = scanner.scan_string()?;
        text.parse()
    } else {
        scanner.scan_number()?.parse()
    }
}

/// `id` is either `null` (treated as absent) or a 32-bit integer.
fn decode_id(scanner: &mut Scanner<'_>) -> ProtocolResult<Option<i32>> {
    if scanner.scan_literal("null").is_ok() {
        return Ok(None);
    }
    let token = scanner.scan_number()?;
    if token.contains('.') {
        return Err(ProtocolError::InvalidId(token.to_string()));
    }
    token
        .parse::<i32>()
        .map(Some)
        .map_err(|_| ProtocolError::InvalidId(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar_kind(result: ProtocolResult<Message>) -> GrammarErrorKind {
        match result {
            Err(ProtocolError::Grammar(err)) => err.kind,
            other => panic!("expected grammar error, got {other:?}"),
        }
    }

    #[test]
    fn decodes_request() {
        let message = decode_message(
            r#"{"jsonrpc":"2.0","id":7,"method":"textDocument/hover","params":{"x":[1,2]}}"#,
        )
        .unwrap();
        assert_eq!(message.jsonrpc, Version::V2);
        assert_eq!(message.id, Some(7));
        assert_eq!(message.method.as_deref(), Some("textDocument/hover"));
        assert_eq!(message.params.unwrap().as_str(), r#"{"x":[1,2]}"#);
        assert!(message.result.is_none());
        assert!(message.error.is_none());
    }

    #[test]
    fn decodes_responses() {
        let ok = decode_message(r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#)
            .unwrap();
        assert_eq!(ok.result.unwrap().as_str(), r#"{"capabilities":{}}"#);

        let err = decode_message(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}}"#,
        )
        .unwrap();
        assert_eq!(err.error.unwrap().as_str(), r#"{"code":-32601,"message":"nope"}"#);
    }

    #[test]
    fn raw_fragments_exclude_surrounding_whitespace() {
        let message =
            decode_message("{ \"jsonrpc\" : \"2.0\" , \"method\" : \"m\" , \"params\" :  [ 1 ]  }")
                .unwrap();
        assert_eq!(message.params.unwrap().as_str(), "[ 1 ]");
    }

    #[test]
    fn version_as_number_or_string() {
        for body in [
            r#"{"jsonrpc":2.0,"method":"m"}"#,
            r#"{"jsonrpc":2,"method":"m"}"#,
            r#"{"jsonrpc":"2","method":"m"}"#,
            r#"{"jsonrpc":+2.0,"method":"m"}"#,
        ] {
            assert_eq!(decode_message(body).unwrap().jsonrpc, Version::V2, "{body}");
        }
        let older = decode_message(r#"{"jsonrpc":"1.0","method":"m"}"#).unwrap();
        assert_eq!(older.jsonrpc, Version::parse("1").unwrap());
    }

    #[test]
    fn invalid_version_text() {
        let result = decode_message(r#"{"jsonrpc":"two","method":"m"}"#);
        assert!(matches!(result, Err(ProtocolError::InvalidVersion(ref v)) if v == "two"));
    }

    #[test]
    fn overly_fine_version_is_rejected() {
        for body in [
            r#"{"jsonrpc":"1e-70000","method":"m"}"#,
            r#"{"jsonrpc":1e-50000000,"method":"m"}"#,
        ] {
            let err = decode_message(body).unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidVersion(_)), "{body}");
            assert!(err.to_string().contains("1e-"));
        }
    }

    #[test]
    fn missing_version_fails() {
        let result = decode_message(r#"{"id":1,"method":"ping"}"#);
        assert!(matches!(result, Err(ProtocolError::MissingVersion)));
    }

    #[test]
    fn null_id_is_absent() {
        let message = decode_message(r#"{"jsonrpc":"2.0","id":null,"method":"exit"}"#).unwrap();
        assert_eq!(message.id, None);
    }

    #[test]
    fn id_range_and_form() {
        let max = decode_message(r#"{"jsonrpc":"2.0","id":2147483647,"method":"m"}"#).unwrap();
        assert_eq!(max.id, Some(i32::MAX));
        let min = decode_message(r#"{"jsonrpc":"2.0","id":-2147483648,"method":"m"}"#).unwrap();
        assert_eq!(min.id, Some(i32::MIN));
        let plus = decode_message(r#"{"jsonrpc":"2.0","id":+5,"method":"m"}"#).unwrap();
        assert_eq!(plus.id, Some(5));

        for body in [
            r#"{"jsonrpc":"2.0","id":2147483648,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":1.5,"method":"m"}"#,
        ] {
            assert!(matches!(decode_message(body), Err(ProtocolError::InvalidId(_))), "{body}");
        }
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0","id":"abc","method":"m"}"#)),
            GrammarErrorKind::InvalidNumber
        );
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0","id":1e3,"method":"m"}"#)),
            GrammarErrorKind::Expected('}')
        );
    }

    #[test]
    fn method_must_be_string() {
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0","method":5}"#)),
            GrammarErrorKind::Expected('"')
        );
    }

    #[test]
    fn unknown_members_are_validated_and_dropped() {
        let message = decode_message(
            r#"{"extra":{"deep":[null,true,"x"]},"jsonrpc":"2.0","method":"m","other":-1.5}"#,
        )
        .unwrap();
        assert_eq!(message.method.as_deref(), Some("m"));

        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0","method":"m","extra":[1,}"#)),
            GrammarErrorKind::InvalidNumber
        );
    }

    #[test]
    fn later_duplicates_win() {
        let message = decode_message(r#"{"jsonrpc":"2.0","method":"a","method":"b"}"#).unwrap();
        assert_eq!(message.method.as_deref(), Some("b"));
    }

    #[test]
    fn rejects_batches_and_non_objects() {
        assert!(matches!(
            decode_message(r#"[{"jsonrpc":"2.0","method":"m"}]"#),
            Err(ProtocolError::BatchNotSupported)
        ));
        assert!(matches!(decode_message("\"text\""), Err(ProtocolError::NotAnObject)));
        assert!(matches!(decode_message("42"), Err(ProtocolError::NotAnObject)));
        assert_eq!(grammar_kind(decode_message("   ")), GrammarErrorKind::UnexpectedEnd);
    }

    #[test]
    fn rejects_trailing_characters() {
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0","method":"m"} {}"#)),
            GrammarErrorKind::TrailingCharacters
        );
        assert!(decode_message("{\"jsonrpc\":\"2.0\",\"method\":\"m\"}\r\n").is_ok());
    }

    #[test]
    fn structural_faults() {
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc" "2.0"}"#)),
            GrammarErrorKind::Expected(':')
        );
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0" "method":"m"}"#)),
            GrammarErrorKind::Expected('}')
        );
        assert_eq!(
            grammar_kind(decode_message(r#"{"jsonrpc":"2.0""#)),
            GrammarErrorKind::UnexpectedEnd
        );
        assert_eq!(
            grammar_kind(decode_message(r#"{jsonrpc:"2.0"}"#)),
            GrammarErrorKind::Expected('"')
        );
    }

    #[test]
    fn tolerates_trailing_comma_at_top_level() {
        let message = decode_message(r#"{"jsonrpc":"2.0","method":"m",}"#).unwrap();
        assert_eq!(message.method.as_deref(), Some("m"));
    }

    #[test]
    fn decoded_strings_unescape() {
        let message =
            decode_message(r#"{"jsonrpc":"2.0","method":"a\"b\\c\nd\u0007é"}"#).unwrap();
        assert_eq!(message.method.as_deref(), Some("a\"b\\c\nd\u{7}é"));
    }

    #[test]
    fn both_result_and_error_still_decode() {
        let message = decode_message(r#"{"jsonrpc":"2.0","result":1,"error":2}"#).unwrap();
        assert_eq!(message.result.unwrap().as_str(), "1");
        assert_eq!(message.error.unwrap().as_str(), "2");
    }
}
