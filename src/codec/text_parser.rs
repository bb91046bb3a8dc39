//! Reader for the structured text and YAML-like wires.
//!
//! Both wires are read by the same parser, which accepts block syntax
//! (`key: value` lines, nesting by indentation, `- ` items) and flow syntax
//! (`{a: 1}`, `[1, 2]`, possibly spread over several lines) anywhere a value
//! may appear. `#` starts a comment that runs to the end of the line.

use super::text::classify_plain;
use super::MAX_DEPTH;
use crate::{Error, Result, ValueOut, ValueOutExt};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Replays a text or YAML-like document body into `out`.
///
/// # Errors
///
/// [`Error::MalformedInput`] naming the first byte that fits no rule.
pub fn copy_to(input: &[u8], out: &mut dyn ValueOut) -> Result<()> {
    let mut parser = Parser {
        input,
        pos: 0,
        depth: 0,
    };
    while let Some((at, indent)) = parser.next_content_line() {
        parser.pos = at;
        match parser.try_key()? {
            Some(key) => {
                out.field(&key)?;
                parser.block_value(indent, out)?;
            }
            None => {
                parser.value(out, Ctx::Block(indent))?;
                parser.expect_line_end()?;
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Flow,
    /// Block context, with the indentation of the enclosing entry.
    Block(usize),
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

fn is_inline_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_ascii_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, pos: usize) -> Option<u8> {
        self.input.get(pos).copied()
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

    fn skip_inline_ws(&mut self) {
        while self.peek().map_or(false, is_inline_space) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.pos += 1;
        }
    }

    /// Skips whitespace, newlines and comments.
    fn skip_ws(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.pos += 1,
                Some(b'#') => self.skip_comment(),
                _ => return,
            }
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\n' | b'\r' | b'#'))
    }

    fn expect_line_end(&mut self) -> Result<()> {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'#') {
            self.skip_comment();
        }
        match self.peek() {
            None | Some(b'\n') => Ok(()),
            Some(_) => Err(self.error("unexpected content after value")),
        }
    }

    /// Finds the next byte of content, past blank lines and comments, and
    /// its column. Does not move.
    fn next_content_line(&self) -> Option<(usize, usize)> {
        let mut line_start = self.input[..self.pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let mut i = self.pos;
        loop {
            match self.input.get(i)? {
                b' ' | b'\t' | b'\r' => i += 1,
                b'\n' => {
                    i += 1;
                    line_start = i;
                }
                b'#' => {
                    while !matches!(self.input.get(i), None | Some(b'\n')) {
                        i += 1;
                    }
                }
                _ => return Some((i, i - line_start)),
            }
        }
    }

    fn is_item_marker(&self, at: usize) -> bool {
        self.peek_at(at) == Some(b'-')
            && matches!(
                self.peek_at(at + 1),
                None | Some(b' ' | b'\t' | b'\n' | b'\r')
            )
    }

    fn utf8(&self, start: usize, end: usize) -> Result<&'a str> {
        let input = self.input;
        std::str::from_utf8(&input[start..end]).map_err(|e| {
            Error::malformed(
                input.get(start + e.valid_up_to()).copied(),
                start + e.valid_up_to(),
                "invalid UTF-8",
            )
        })
    }

    fn plain_key(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while !matches!(
            self.peek(),
            None | Some(b':' | b'\n' | b'\r' | b'{' | b'}' | b'[' | b']' | b',' | b'#')
        ) {
            self.pos += 1;
        }
        Ok(self.utf8(start, self.pos)?.trim_end_matches(is_ascii_space))
    }

    /// Reads `key:` if the line starts with one, else leaves the position alone.
    fn try_key(&mut self) -> Result<Option<String>> {
        let start = self.pos;
        let quoted = matches!(self.peek(), Some(b'"' | b'\''));
        let key = if quoted {
            read_quoted(self.input, &mut self.pos)?
        } else {
            self.plain_key()?.to_string()
        };
        self.skip_inline_ws();
        let is_key = self.peek() == Some(b':')
            && matches!(
                self.peek_at(self.pos + 1),
                None | Some(b' ' | b'\t' | b'\n' | b'\r')
            );
        if is_key && (quoted || !key.is_empty()) {
            self.pos += 1;
            Ok(Some(key))
        } else {
            self.pos = start;
            Ok(None)
        }
    }

    /// Reads the value of a block entry whose key sits at `parent` indentation.
    fn block_value(&mut self, parent: usize, out: &mut dyn ValueOut) -> Result<()> {
        self.skip_inline_ws();
        if self.at_line_end() {
            return self.nested_block(parent, out);
        }
        self.value(out, Ctx::Block(parent))?;
        self.expect_line_end()
    }

    fn nested_block(&mut self, parent: usize, out: &mut dyn ValueOut) -> Result<()> {
        match self.next_content_line() {
            Some((at, indent)) if indent > parent => {
                self.pos = at;
                if self.is_item_marker(at) {
                    self.block_sequence(indent, out)
                } else {
                    self.block_mapping(indent, out)
                }
            }
            _ => {
                self.expect_line_end()?;
                out.null()
            }
        }
    }

    fn block_mapping(&mut self, indent: usize, out: &mut dyn ValueOut) -> Result<()> {
        self.enter()?;
        out.start_object()?;
        while let Some((at, column)) = self.next_content_line() {
            if column < indent || self.is_item_marker(at) {
                break;
            }
            self.pos = at;
            if column > indent {
                return Err(self.error("unexpected indentation"));
            }
            let key = self
                .try_key()?
                .ok_or_else(|| self.error("expected a field name"))?;
            out.field(&key)?;
            self.block_value(indent, out)?;
        }
        self.depth -= 1;
        out.end_object()
    }

    fn block_sequence(&mut self, indent: usize, out: &mut dyn ValueOut) -> Result<()> {
        self.enter()?;
        out.start_sequence()?;
        while let Some((at, column)) = self.next_content_line() {
            if column != indent || !self.is_item_marker(at) {
                if column > indent {
                    self.pos = at;
                    return Err(self.error("unexpected indentation"));
                }
                break;
            }
            self.pos = at + 1;
            self.block_value(indent, out)?;
        }
        self.depth -= 1;
        out.end_sequence()
    }

    fn value(&mut self, out: &mut dyn ValueOut, ctx: Ctx) -> Result<()> {
        match ctx {
            Ctx::Flow => self.skip_ws(),
            Ctx::Block(_) => self.skip_inline_ws(),
        }
        match self.peek() {
            None => Err(self.error("expected a value")),
            Some(b'{') => self.flow_object(out),
            Some(b'[') => self.flow_sequence(out),
            Some(b'"' | b'\'') => {
                let text = read_quoted(self.input, &mut self.pos)?;
                out.text(&text)
            }
            Some(b'!') => self.tagged(out, ctx),
            Some(b'}' | b']' | b',') if ctx == Ctx::Flow => Err(self.error("expected a value")),
            Some(_) => {
                let text = self.plain(ctx == Ctx::Flow)?;
                match classify_plain(text) {
                    Some(value) => out.write_value(&value),
                    None => out.text(text),
                }
            }
        }
    }

    fn plain(&mut self, in_flow: bool) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            let ends = match b {
                b'\n' | b'\r' => true,
                b',' | b'}' | b']' => in_flow,
                b'#' => self.pos > start && is_inline_space(self.input[self.pos - 1]),
                _ => false,
            };
            if ends {
                break;
            }
            self.pos += 1;
        }
        let text = self.utf8(start, self.pos)?.trim_end_matches(is_ascii_space);
        if text.is_empty() {
            self.pos = start;
            return Err(self.error("expected a value"));
        }
        Ok(text)
    }

    fn tag_word(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while !matches!(
            self.peek(),
            None | Some(b' ' | b'\t' | b'\r' | b'\n' | b'{' | b'[' | b',' | b'}' | b']')
        ) {
            self.pos += 1;
        }
        let word = self.utf8(start, self.pos)?;
        if word.is_empty() {
            return Err(self.error("expected a tag name"));
        }
        Ok(word)
    }

    fn tagged(&mut self, out: &mut dyn ValueOut, ctx: Ctx) -> Result<()> {
        self.pos += 1;
        if self.peek() == Some(b'!') {
            self.pos += 1;
            let tag_start = self.pos;
            if self.tag_word()? != "binary" {
                self.pos = tag_start;
                return Err(self.error("unsupported tag"));
            }
            self.skip_inline_ws();
            let start = self.pos;
            let encoded = match self.peek() {
                Some(b'"' | b'\'') => read_quoted(self.input, &mut self.pos)?,
                Some(b',' | b'}' | b']') if ctx == Ctx::Flow => String::new(),
                _ if self.at_line_end() => String::new(),
                _ => self.plain(ctx == Ctx::Flow)?.to_string(),
            };
            let bytes = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|_| Error::malformed(self.peek_at(start), start, "invalid base64"))?;
            return out.bytes(&bytes);
        }

        let name = self.tag_word()?;
        self.enter()?;
        out.type_prefix(name)?;
        let block_parent = match ctx {
            Ctx::Block(parent) => {
                self.skip_inline_ws();
                Some(parent).filter(|_| self.at_line_end())
            }
            Ctx::Flow => None,
        };
        match block_parent {
            Some(parent) => self.nested_block(parent, out)?,
            None => self.value(out, ctx)?,
        }
        self.depth -= 1;
        Ok(())
    }

    fn flow_object(&mut self, out: &mut dyn ValueOut) -> Result<()> {
        self.enter()?;
        self.pos += 1;
        out.start_object()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated object")),
                _ => {}
            }
            let key = match self.peek() {
                Some(b'"' | b'\'') => read_quoted(self.input, &mut self.pos)?,
                _ => self.plain_key()?.to_string(),
            };
            self.skip_ws();
            if self.peek() != Some(b':') {
                return Err(self.error("expected ':' after field name"));
            }
            self.pos += 1;
            out.field(&key)?;
            self.value(out, Ctx::Flow)?;
            if !self.flow_separator(b'}')? {
                break;
            }
        }
        self.depth -= 1;
        out.end_object()
    }

    fn flow_sequence(&mut self, out: &mut dyn ValueOut) -> Result<()> {
        self.enter()?;
        self.pos += 1;
        out.start_sequence()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated sequence")),
                _ => {}
            }
            self.value(out, Ctx::Flow)?;
            if !self.flow_separator(b']')? {
                break;
            }
        }
        self.depth -= 1;
        out.end_sequence()
    }

    /// Consumes `,` (more entries follow) or `close` (done).
    fn flow_separator(&mut self, close: u8) -> Result<bool> {
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
            _ => Err(self.error(if close == b'}' {
                "expected ',' or '}'"
            } else {
                "expected ',' or ']'"
            })),
        }
    }
}

/// Reads a quoted string starting at `*pos`, leaving `*pos` after the
/// closing quote.
///
/// Double quotes support backslash escapes, including `\uXXXX` with
/// surrogate pairs; single quotes only escape themselves by doubling.
pub(crate) fn read_quoted(input: &[u8], pos: &mut usize) -> Result<String> {
    let start = *pos;
    let quote = input[start];
    *pos += 1;
    let mut buf = Vec::new();
    loop {
        let Some(&b) = input.get(*pos) else {
            return Err(Error::malformed(None, *pos, "unterminated string"));
        };
        *pos += 1;
        match b {
            b'\'' if quote == b'\'' && input.get(*pos) == Some(&b'\'') => {
                buf.push(b'\'');
                *pos += 1;
            }
            b if b == quote => break,
            b'\\' if quote == b'"' => read_escape(input, pos, &mut buf)?,
            _ => buf.push(b),
        }
    }
    String::from_utf8(buf).map_err(|e| {
        let offset = start + 1 + e.utf8_error().valid_up_to();
        Error::malformed(input.get(offset).copied(), offset, "invalid UTF-8 in string")
    })
}

fn read_escape(input: &[u8], pos: &mut usize, buf: &mut Vec<u8>) -> Result<()> {
    let Some(&e) = input.get(*pos) else {
        return Err(Error::malformed(None, *pos, "unterminated string"));
    };
    *pos += 1;
    let ch = match e {
        b'"' => '"',
        b'\\' => '\\',
        b'/' => '/',
        b'n' => '\n',
        b'r' => '\r',
        b't' => '\t',
        b'b' => '\u{8}',
        b'f' => '\u{c}',
        b'u' => {
            let at = *pos - 2;
            let mut code = hex4(input, pos)?;
            if (0xD800..0xDC00).contains(&code) {
                if input.get(*pos..*pos + 2) != Some(b"\\u".as_slice()) {
                    return Err(Error::malformed(input.get(*pos).copied(), *pos, "unpaired surrogate"));
                }
                *pos += 2;
                let low = hex4(input, pos)?;
                if !(0xDC00..0xE000).contains(&low) {
                    return Err(Error::malformed(Some(b'u'), *pos - 5, "invalid low surrogate"));
                }
                code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
            }
            char::from_u32(code)
                .ok_or_else(|| Error::malformed(Some(b'\\'), at, "invalid unicode escape"))?
        }
        other => return Err(Error::malformed(Some(other), *pos - 1, "invalid escape")),
    };
    let mut utf8 = [0u8; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
    Ok(())
}

fn hex4(input: &[u8], pos: &mut usize) -> Result<u32> {
    let digits = input
        .get(*pos..*pos + 4)
        .ok_or_else(|| Error::malformed(None, input.len(), "truncated unicode escape"))?;
    let text = std::str::from_utf8(digits)
        .ok()
        .filter(|t| t.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| Error::malformed(Some(digits[0]), *pos, "invalid unicode escape"))?;
    let code = u32::from_str_radix(text, 16)
        .map_err(|_| Error::malformed(Some(digits[0]), *pos, "invalid unicode escape"))?;
    *pos += 4;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wire_value, FieldKey, Value, ValueBuilder};

    fn events(text: &str) -> Vec<(Option<FieldKey>, Value)> {
        let mut builder = ValueBuilder::new();
        copy_to(text.as_bytes(), &mut builder).unwrap();
        builder.into_events().unwrap()
    }

    fn value(text: &str) -> Value {
        let mut builder = ValueBuilder::new();
        copy_to(text.as_bytes(), &mut builder).unwrap();
        builder.into_value().unwrap()
    }

    #[test]
    fn test_single_event() {
        let events = events("key: 42\n");
        assert_eq!(events, vec![(Some(FieldKey::Name("key".into())), Value::from(42))]);
    }

    #[test]
    fn test_braced_text() {
        let v = value("# header\npoint: {\n  x: 1,\n  y: [\n    2,\n    3\n  ]\n}\nempty: { }\n");
        assert_eq!(
            v,
            wire_value!({ "point": { "x": 1, "y": [2, 3] }, "empty": {} })
        );
    }

    #[test]
    fn test_yaml_blocks() {
        let text = "point:\n  x: 1  # trailing comment\n  y:\n    - 2\n    - 3\nlist:\n  - {a: 1}\n  - b\nnone: []\nnothing:\nlast: 'it''s'\n";
        let v = value(text);
        assert_eq!(
            v,
            wire_value!({
                "point": { "x": 1, "y": [2, 3] },
                "list": [{ "a": 1 }, "b"],
                "none": [],
                "nothing": null,
                "last": "it's"
            })
        );
    }

    #[test]
    fn test_tags_and_binary() {
        let v = value("p: !Point {\n  x: 1\n}\nq: !Point {x: 2}\nb: !!binary AQID\nblock: !Point\n  x: 3\n");
        assert_eq!(v.get("p"), Some(&Value::typed("Point", wire_value!({ "x": 1 }))));
        assert_eq!(v.get("q"), Some(&Value::typed("Point", wire_value!({ "x": 2 }))));
        assert_eq!(v.get("b"), Some(&Value::Bytes(vec![1, 2, 3])));
        assert_eq!(v.get("block"), Some(&Value::typed("Point", wire_value!({ "x": 3 }))));
    }

    #[test]
    fn test_plain_scalars() {
        let v = value("a: hello world\nb: \"42\"\nc: -1.5\nd: NaN\ne: ~\nf: true\ng: \"line\\nbreak \\u00e9\"\n");
        assert_eq!(v.get("a"), Some(&Value::from("hello world")));
        assert_eq!(v.get("b"), Some(&Value::from("42")));
        assert_eq!(v.get("c"), Some(&Value::from(-1.5)));
        assert!(v.get("d").and_then(Value::as_f64).map_or(false, f64::is_nan));
        assert_eq!(v.get("e"), Some(&Value::Null));
        assert_eq!(v.get("f"), Some(&Value::Bool(true)));
        assert_eq!(v.get("g"), Some(&Value::from("line\nbreak é")));
    }

    #[test]
    fn test_bare_values() {
        let events = events("42\n\"text\"\n[1, 2]\n");
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|(key, _)| key.is_none()));
        assert_eq!(events[2].1, wire_value!([1, 2]));
    }

    #[test]
    fn test_surrogate_pairs() {
        let mut pos = 0;
        let s = read_quoted(br#""\ud83d\ude00""#, &mut pos).unwrap();
        assert_eq!(s, "\u{1F600}");
        let mut pos = 0;
        assert!(read_quoted(br#""\ude00""#, &mut pos).is_err());
    }

    #[test]
    fn test_malformed_input_reports_offset() {
        let mut builder = ValueBuilder::new();
        let err = copy_to(b"a: {x: 1]\n", &mut builder).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));

        let mut builder = ValueBuilder::new();
        let err = copy_to(b"a: \"open\n", &mut builder).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { byte: None, .. }));

        let mut builder = ValueBuilder::new();
        let err = copy_to(b"a: [1, 2\n", &mut builder).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let deep = |input: String| {
            let mut builder = ValueBuilder::new();
            copy_to(input.as_bytes(), &mut builder)
        };
        let limit = format!("a: {}{}\n", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(deep(limit).is_ok());

        for input in [
            format!("a: {}", "[".repeat(200_000)),
            format!("a: {}", "{x: ".repeat(200_000)),
            format!("a: {}1\n", "!T ".repeat(200_000)),
            (0..=MAX_DEPTH + 1)
                .map(|i| format!("{}k:\n", " ".repeat(i)))
                .collect::<String>(),
        ] {
            assert!(matches!(deep(input), Err(Error::MalformedInput { .. })));
        }
    }
}
