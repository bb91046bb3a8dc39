//! Reader for the JSON wire.
//!
//! JSON is copied token by token into any [`ValueOut`], so the same routine
//! decodes JSON documents and translates JSON into the other wires. Numbers
//! are handed over as literals through [`ValueOut::raw_number`]: textual
//! writers keep them verbatim, the binary writer and the value builder
//! parse them.

use super::text_parser::read_quoted;
use super::MAX_DEPTH;
use crate::out::parse_number;
use crate::{Error, Result, ValueOut};

/// Replays a JSON document into `out`.
///
/// A top-level object is read as a list of events, one per member, unless
/// it is an explicit-type wrapper. Top-level `"name": value` pairs without
/// braces are events too; anything else at the top level is a bare value.
///
/// `{"@Type": value}` wrappers are only recognized when `use_types` is set;
/// otherwise they are ordinary objects with an `@Type` member.
///
/// # Errors
///
/// [`Error::MalformedInput`] naming the offending byte and its offset.
///
/// # Examples
///
/// ```rust
/// use serde_wire::{codec::json, wire_value, ValueBuilder};
///
/// let mut builder = ValueBuilder::new();
/// json::copy_to(br#"{"a":1,"b":[2,3]}"#, false, &mut builder).unwrap();
/// assert_eq!(builder.into_value().unwrap(), wire_value!({ "a": 1, "b": [2, 3] }));
/// ```
pub fn copy_to(input: &[u8], use_types: bool, out: &mut dyn ValueOut) -> Result<()> {
    let mut reader = JsonReader {
        input,
        pos: 0,
        use_types,
        depth: 0,
    };
    reader.skip_ws();
    if reader.peek() == Some(b'{') && !reader.typed_wrapper_ahead() {
        reader.pos += 1;
        reader.members(out)?;
    }
    loop {
        reader.skip_ws();
        match reader.peek() {
            None => return Ok(()),
            Some(b'"') => {
                let start = reader.pos;
                let name = read_quoted(input, &mut reader.pos)?;
                reader.skip_ws();
                if reader.peek() == Some(b':') {
                    reader.pos += 1;
                    out.field(&name)?;
                    reader.copy_one(out)?;
                } else {
                    reader.pos = start;
                    reader.copy_one(out)?;
                }
            }
            Some(_) => reader.copy_one(out)?,
        }
        reader.skip_ws();
        if reader.peek() == Some(b',') {
            reader.pos += 1;
        }
    }
}

struct JsonReader<'a> {
    input: &'a [u8],
    pos: usize,
    use_types: bool,
    depth: usize,
}

impl<'a> JsonReader<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn error(&self, msg: &str) -> Error {
        Error::malformed(self.peek(), self.pos, msg)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, msg: &str) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(msg))
        }
    }

    /// Is the `{` at the current position followed by an `"@..."` key?
    fn typed_wrapper_ahead(&self) -> bool {
        if !self.use_types {
            return false;
        }
        let rest = &self.input[self.pos + 1..];
        let mut i = 0;
        while matches!(rest.get(i), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            i += 1;
        }
        rest.get(i) == Some(&b'"') && rest.get(i + 1) == Some(&b'@')
    }

    fn key(&mut self) -> Result<String> {
        self.skip_ws();
        if self.peek() != Some(b'"') {
            return Err(self.error("expected a quoted field name"));
        }
        let key = read_quoted(self.input, &mut self.pos)?;
        self.expect(b':', "expected ':' after field name")?;
        Ok(key)
    }

    /// Copies `"key": value` pairs up to and including the closing `}`.
    fn members(&mut self, out: &mut dyn ValueOut) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(());
        }
        loop {
            let key = self.key()?;
            out.field(&key)?;
            self.copy_one(out)?;
            if !self.expect_comma(b'}')? {
                return Ok(());
            }
        }
    }

    /// Consumes `,` (more entries follow) or `close` (done).
    fn expect_comma(&mut self, close: u8) -> Result<bool> {
        self.skip_ws();
        match self.peek() {
            Some(b',') => {
                self.pos += 1;
                Ok(true)
            }
            Some(b) if b == close => {
                self.pos += 1;
                Ok(false)
            }
            None if close == b'}' => Err(self.error("unterminated object")),
            None => Err(self.error("unterminated array")),
            Some(_) => Err(self.error(if close == b'}' {
                "expected ',' or '}'"
            } else {
                "expected ',' or ']'"
            })),
        }
    }

    /// Does the literal `word` start here, not followed by more identifier?
    fn literal(&self, word: &[u8]) -> bool {
        self.input[self.pos..].starts_with(word)
            && !self
                .input
                .get(self.pos + word.len())
                .map_or(false, |b| b.is_ascii_alphanumeric() || *b == b'_')
    }

    /// Copies exactly one JSON value.
    fn copy_one(&mut self, out: &mut dyn ValueOut) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("expected a value")),
            Some(b'"') => {
                let text = read_quoted(self.input, &mut self.pos)?;
                out.text(&text)
            }
            Some(b'{') if self.typed_wrapper_ahead() => {
                self.enter()?;
                self.pos += 1;
                let key = self.key()?;
                out.type_prefix(&key[1..])?;
                self.copy_one(out)?;
                self.expect(b'}', "expected '}' closing a typed value")?;
                self.depth -= 1;
                Ok(())
            }
            Some(b'{') => {
                self.enter()?;
                self.pos += 1;
                out.start_object()?;
                self.members(out)?;
                self.depth -= 1;
                out.end_object()
            }
            Some(b'[') => {
                self.enter()?;
                self.pos += 1;
                out.start_sequence()?;
                self.skip_ws();
                if self.peek() == Some(b']') {
                    self.pos += 1;
                } else {
                    loop {
                        self.copy_one(out)?;
                        if !self.expect_comma(b']')? {
                            break;
                        }
                    }
                }
                self.depth -= 1;
                out.end_sequence()
            }
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => {
                let start = self.pos;
                while matches!(
                    self.peek(),
                    Some(b'+' | b'-' | b'.' | b'e' | b'E' | b'0'..=b'9')
                ) {
                    self.pos += 1;
                }
                let literal = std::str::from_utf8(&self.input[start..self.pos])
                    .ok()
                    .filter(|literal| parse_number(literal).is_some())
                    .ok_or_else(|| Error::malformed(Some(self.input[start]), start, "invalid number"))?;
                out.raw_number(literal)
            }
            Some(b't') if self.literal(b"true") => {
                self.pos += 4;
                out.bool(true)
            }
            Some(b'f') if self.literal(b"false") => {
                self.pos += 5;
                out.bool(false)
            }
            Some(b'n') if self.literal(b"null") => {
                self.pos += 4;
                out.null()
            }
            Some(_) => Err(self.error("unexpected character")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::text::{Dialect, TextValueOut};
    use crate::{wire_value, ByteCursor, Value, ValueBuilder};

    fn value(json: &str, use_types: bool) -> Value {
        let mut builder = ValueBuilder::new();
        copy_to(json.as_bytes(), use_types, &mut builder).unwrap();
        builder.into_value().unwrap()
    }

    fn malformed(json: &str) -> Error {
        let mut builder = ValueBuilder::new();
        copy_to(json.as_bytes(), false, &mut builder).unwrap_err()
    }

    fn rewrite(json: &str, use_types: bool) -> String {
        let mut cursor = ByteCursor::new();
        {
            let mut out = TextValueOut::new(&mut cursor, Dialect::Json).with_use_types(use_types);
            copy_to(json.as_bytes(), use_types, &mut out).unwrap();
            out.finish().unwrap();
        }
        String::from_utf8(cursor.as_slice().to_vec()).unwrap()
    }

    #[test]
    fn test_object_becomes_events() {
        assert_eq!(value(r#"{"a":1,"b":[2,3]}"#, false), wire_value!({ "a": 1, "b": [2, 3] }));
    }

    #[test]
    fn test_canonical_json_is_byte_stable() {
        for json in [
            r#"{"a":1,"b":[2,3]}"#,
            r#"{"s":"x\"y","n":null,"t":true,"f":-1.5e-3,"o":{"k":[]}}"#,
            r#"[1,{"a":{}}]"#,
        ] {
            assert_eq!(rewrite(json, false), json);
        }
        let typed = r#"{"p":{"@Point":{"x":1}}}"#;
        assert_eq!(rewrite(typed, true), typed);
    }

    #[test]
    fn test_typed_wrapper_needs_use_types() {
        let typed = value(r#"{"p":{"@Point":{"x":1}}}"#, true);
        assert_eq!(typed.get("p").and_then(Value::type_name), Some("Point"));

        let plain = value(r#"{"p":{"@Point":{"x":1}}}"#, false);
        assert!(plain.get("p").and_then(|p| p.get("@Point")).is_some());
    }

    #[test]
    fn test_null_is_not_a_prefix_match() {
        assert_eq!(value("[null]", false), wire_value!([null]));
        assert!(matches!(malformed("[nullable]"), Error::MalformedInput { .. }));
    }

    #[test]
    fn test_malformed_reports_byte_and_offset() {
        match malformed(r#"{"a":1;"b":2}"#) {
            Error::MalformedInput { byte, offset, .. } => {
                assert_eq!(byte, Some(b';'));
                assert_eq!(offset, 6);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(malformed(r#"{"a":"open"#), Error::MalformedInput { byte: None, .. }));
        assert!(matches!(malformed("[1,2"), Error::MalformedInput { byte: None, .. }));
        assert!(matches!(malformed("[1.2.3]"), Error::MalformedInput { .. }));
        assert!(matches!(malformed("@"), Error::MalformedInput { byte: Some(b'@'), .. }));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let limit = "[".repeat(MAX_DEPTH) + &"]".repeat(MAX_DEPTH);
        assert!(copy_to(limit.as_bytes(), false, &mut ValueBuilder::new()).is_ok());

        match malformed(&"[".repeat(200_000)) {
            Error::MalformedInput { byte, offset, .. } => {
                assert_eq!(byte, Some(b'['));
                assert_eq!(offset, MAX_DEPTH);
            }
            other => panic!("unexpected error {:?}", other),
        }
        let typed = r#"{"@T":"#.repeat(200_000);
        let mut builder = ValueBuilder::new();
        assert!(matches!(
            copy_to(typed.as_bytes(), true, &mut builder),
            Err(Error::MalformedInput { .. })
        ));
    }
}
