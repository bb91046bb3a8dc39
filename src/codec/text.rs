//! Writer shared by the structured text, YAML-like and JSON wires.
//!
//! The three textual formats differ in a handful of rules (how composites
//! are laid out, when keys are quoted, how explicit types are spelled), so a
//! single state machine renders all of them, driven by [`Dialect`].
//!
//! Composite layouts:
//!
//! - **Braced**: `{` and `[` with one entry per indented line, comma separated
//!   (structured text)
//! - **Block**: entries on indented lines, `- ` before sequence items, no
//!   brackets (YAML-like mappings under a key)
//! - **Flow**: everything on one line, `{a: 1, b: [2, 3]}` (YAML-like
//!   sequence items and typed values, and all of JSON)

use crate::out::parse_number;
use crate::value::format_float;
use crate::{ByteCursor, DocumentOut, Error, Result, Value, ValueOut, WireType};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::ops::DerefMut;

/// Per-format rules of the textual writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Text,
    Yaml,
    Json,
}

impl Dialect {
    /// The dialect used to write `wire_type`, if it is textual.
    #[must_use]
    pub fn for_wire(wire_type: WireType) -> Option<Self> {
        match wire_type {
            WireType::Text | WireType::ReadAny => Some(Dialect::Text),
            WireType::Yaml => Some(Dialect::Yaml),
            WireType::Json => Some(Dialect::Json),
            WireType::Binary => None,
        }
    }

    fn flow_separator(self) -> &'static str {
        match self {
            Dialect::Json => ",",
            _ => ", ",
        }
    }

    fn space_after_colon(self) -> bool {
        self != Dialect::Json
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Object,
    Sequence,
    /// `{"@Type": ...}` around one JSON value
    TypeWrapper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    Braced,
    Block,
    Flow,
}

#[derive(Debug)]
struct Frame {
    kind: Kind,
    layout: Layout,
    count: usize,
}

enum Prefix {
    Nothing,
    Space,
    Newline,
    Item { first: bool, layout: Layout, depth: usize },
}

/// Renders [`ValueOut`] calls as text into a [`ByteCursor`].
pub struct TextValueOut<B> {
    cursor: B,
    dialect: Dialect,
    indent: usize,
    use_types: bool,
    stack: Vec<Frame>,
    pending_key: bool,
    after_tag: bool,
    top_values: usize,
    opened_top_brace: bool,
}

impl<B: DerefMut<Target = ByteCursor>> TextValueOut<B> {
    pub fn new(cursor: B, dialect: Dialect) -> Self {
        TextValueOut {
            cursor,
            dialect,
            indent: 2,
            use_types: false,
            stack: Vec::new(),
            pending_key: false,
            after_tag: false,
            top_values: 0,
            opened_top_brace: false,
        }
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Writes JSON type prefixes as `{"@Type": value}` instead of dropping them.
    #[must_use]
    pub fn with_use_types(mut self, use_types: bool) -> Self {
        self.use_types = use_types;
        self
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn into_inner(self) -> B {
        self.cursor
    }

    fn newline_indent(&mut self, depth: usize) {
        self.cursor.write_byte(b'\n');
        for _ in 0..self.indent * depth {
            self.cursor.write_byte(b' ');
        }
    }

    fn composite_layout(&self) -> Layout {
        match self.dialect {
            Dialect::Json => Layout::Flow,
            Dialect::Text => Layout::Braced,
            Dialect::Yaml if self.after_tag => Layout::Flow,
            Dialect::Yaml => match self.stack.last() {
                None if self.pending_key => Layout::Block,
                Some(Frame {
                    kind: Kind::Object,
                    layout: Layout::Block,
                    ..
                }) => Layout::Block,
                _ => Layout::Flow,
            },
        }
    }

    fn begin_value(&mut self, block: bool) -> Result<()> {
        if std::mem::take(&mut self.after_tag) {
            return Ok(());
        }
        let pending_key = std::mem::take(&mut self.pending_key);
        let depth = self.stack.len();
        let prefix = match self.stack.last_mut() {
            None if pending_key => Prefix::Space,
            None => {
                if self.dialect == Dialect::Json && self.opened_top_brace {
                    return Err(Error::custom(
                        "a JSON document cannot mix events and bare values",
                    ));
                }
                self.top_values += 1;
                if self.dialect == Dialect::Json && self.top_values > 1 {
                    Prefix::Newline
                } else {
                    Prefix::Nothing
                }
            }
            Some(frame) => match frame.kind {
                Kind::TypeWrapper => Prefix::Nothing,
                Kind::Object if pending_key => Prefix::Space,
                Kind::Object => {
                    return Err(Error::custom("object value written without a field name"));
                }
                Kind::Sequence => {
                    let first = frame.count == 0;
                    frame.count += 1;
                    Prefix::Item {
                        first,
                        layout: frame.layout,
                        depth,
                    }
                }
            },
        };

        match prefix {
            Prefix::Nothing => {}
            Prefix::Newline => self.cursor.write_byte(b'\n'),
            Prefix::Space => {
                if self.dialect.space_after_colon() && !block {
                    self.cursor.write_byte(b' ');
                }
            }
            Prefix::Item {
                first,
                layout,
                depth,
            } => match layout {
                Layout::Braced => {
                    if !first {
                        self.cursor.write_byte(b',');
                    }
                    self.newline_indent(depth);
                }
                Layout::Block => {
                    self.newline_indent(depth);
                    self.cursor.append("- ");
                }
                Layout::Flow => {
                    if !first {
                        let separator = self.dialect.flow_separator();
                        self.cursor.append(separator);
                    }
                }
            },
        }
        Ok(())
    }

    fn end_value(&mut self) {
        loop {
            match self.stack.last() {
                None => {
                    if self.dialect != Dialect::Json {
                        self.cursor.write_byte(b'\n');
                    }
                    return;
                }
                Some(frame) if frame.kind == Kind::TypeWrapper => {
                    self.stack.pop();
                    self.cursor.write_byte(b'}');
                }
                Some(_) => return,
            }
        }
    }

    fn scalar(&mut self, literal: &str) -> Result<()> {
        self.begin_value(false)?;
        self.cursor.append(literal);
        self.end_value();
        Ok(())
    }

    fn write_key(&mut self, name: &str) {
        if self.dialect == Dialect::Json || needs_quotes(name, true) {
            write_quoted(&mut self.cursor, name);
        } else {
            self.cursor.append(name);
        }
    }

    fn open(&mut self, kind: Kind) -> Result<()> {
        let layout = self.composite_layout();
        self.begin_value(layout == Layout::Block)?;
        if layout != Layout::Block {
            self.cursor
                .write_byte(if kind == Kind::Object { b'{' } else { b'[' });
        }
        self.stack.push(Frame {
            kind,
            layout,
            count: 0,
        });
        Ok(())
    }

    fn close(&mut self, kind: Kind) -> Result<()> {
        let depth = self.stack.len();
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::custom("close without a matching open"))?;
        if frame.kind != kind {
            return Err(Error::custom("mismatched close of object or sequence"));
        }
        if std::mem::take(&mut self.pending_key) {
            return Err(Error::custom("field written without a value"));
        }
        let (empty, close) = match kind {
            Kind::Sequence => (" []", b']'),
            _ => (" {}", b'}'),
        };
        match frame.layout {
            Layout::Braced if frame.count == 0 => {
                self.cursor.write_byte(b' ');
                self.cursor.write_byte(close);
            }
            Layout::Braced => {
                self.newline_indent(depth - 1);
                self.cursor.write_byte(close);
            }
            Layout::Block if frame.count == 0 => self.cursor.append(empty),
            Layout::Block => {}
            Layout::Flow => self.cursor.write_byte(close),
        }
        self.end_value();
        Ok(())
    }
}

impl<B: DerefMut<Target = ByteCursor>> ValueOut for TextValueOut<B> {
    fn field(&mut self, name: &str) -> Result<()> {
        if self.pending_key || self.after_tag {
            return Err(Error::custom(format!(
                "field '{}' written where a value was expected",
                name
            )));
        }
        let depth = self.stack.len();
        match self.stack.last_mut() {
            None => {
                if self.dialect == Dialect::Json {
                    if self.top_values > 0 {
                        return Err(Error::custom(
                            "a JSON document cannot mix events and bare values",
                        ));
                    }
                    let open = if self.opened_top_brace { b',' } else { b'{' };
                    self.opened_top_brace = true;
                    self.cursor.write_byte(open);
                }
            }
            Some(frame) if frame.kind == Kind::Object => {
                let first = frame.count == 0;
                frame.count += 1;
                match frame.layout {
                    Layout::Braced => {
                        if !first {
                            self.cursor.write_byte(b',');
                        }
                        self.newline_indent(depth);
                    }
                    Layout::Block => self.newline_indent(depth),
                    Layout::Flow => {
                        if !first {
                            let separator = self.dialect.flow_separator();
                            self.cursor.append(separator);
                        }
                    }
                }
            }
            Some(_) => {
                return Err(Error::custom(format!(
                    "field '{}' written inside a sequence",
                    name
                )));
            }
        }
        self.write_key(name);
        self.cursor.write_byte(b':');
        self.pending_key = true;
        Ok(())
    }

    fn field_id(&mut self, id: u32) -> Result<()> {
        self.field(&id.to_string())
    }

    fn type_prefix(&mut self, type_name: &str) -> Result<()> {
        match self.dialect {
            Dialect::Json if !self.use_types => Ok(()),
            Dialect::Json => {
                self.begin_value(false)?;
                self.cursor.write_byte(b'{');
                write_quoted(&mut self.cursor, &format!("@{}", type_name));
                self.cursor.write_byte(b':');
                self.stack.push(Frame {
                    kind: Kind::TypeWrapper,
                    layout: Layout::Flow,
                    count: 0,
                });
                Ok(())
            }
            Dialect::Text | Dialect::Yaml => {
                self.begin_value(false)?;
                self.cursor.write_byte(b'!');
                self.cursor.append(type_name);
                self.cursor.write_byte(b' ');
                self.after_tag = true;
                Ok(())
            }
        }
    }

    fn null(&mut self) -> Result<()> {
        self.scalar("null")
    }

    fn bool(&mut self, value: bool) -> Result<()> {
        self.scalar(if value { "true" } else { "false" })
    }

    fn int64(&mut self, value: i64) -> Result<()> {
        self.scalar(&value.to_string())
    }

    fn uint64(&mut self, value: u64) -> Result<()> {
        self.scalar(&value.to_string())
    }

    fn float32(&mut self, value: f32) -> Result<()> {
        if self.dialect == Dialect::Json && !value.is_finite() {
            return self.float64(f64::from(value));
        }
        // shortest text that reads back as the same f32
        let literal = format!("{:?}", value);
        self.scalar(match literal.as_str() {
            "NaN" => "NaN",
            "inf" => "Infinity",
            "-inf" => "-Infinity",
            other => other,
        })
    }

    fn float64(&mut self, value: f64) -> Result<()> {
        if self.dialect == Dialect::Json && value.is_nan() {
            return self.scalar("null");
        }
        if self.dialect == Dialect::Json && value.is_infinite() {
            // no JSON literal; float readers parse the string back
            return self.text(&format_float(value));
        }
        self.scalar(&format_float(value))
    }

    fn text(&mut self, value: &str) -> Result<()> {
        self.begin_value(false)?;
        if self.dialect == Dialect::Json || needs_quotes(value, false) {
            write_quoted(&mut self.cursor, value);
        } else {
            self.cursor.append(value);
        }
        self.end_value();
        Ok(())
    }

    fn bytes(&mut self, value: &[u8]) -> Result<()> {
        let encoded = STANDARD.encode(value);
        self.begin_value(false)?;
        if self.dialect == Dialect::Json {
            write_quoted(&mut self.cursor, &encoded);
        } else {
            self.cursor.append("!!binary ");
            if encoded.is_empty() {
                self.cursor.append("\"\"");
            } else {
                self.cursor.append(&encoded);
            }
        }
        self.end_value();
        Ok(())
    }

    fn raw_number(&mut self, literal: &str) -> Result<()> {
        if parse_number(literal).is_none() {
            return Err(Error::type_mismatch("number", &format!("{:?}", literal)));
        }
        self.scalar(literal)
    }

    fn start_object(&mut self) -> Result<()> {
        self.open(Kind::Object)
    }

    fn end_object(&mut self) -> Result<()> {
        self.close(Kind::Object)
    }

    fn start_sequence(&mut self) -> Result<()> {
        self.open(Kind::Sequence)
    }

    fn end_sequence(&mut self) -> Result<()> {
        self.close(Kind::Sequence)
    }

    fn finish(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::custom("unterminated object or sequence"));
        }
        if self.pending_key || self.after_tag {
            return Err(Error::custom("document ends where a value was expected"));
        }
        if std::mem::take(&mut self.opened_top_brace) {
            self.cursor.write_byte(b'}');
        }
        Ok(())
    }
}

impl<B: DerefMut<Target = ByteCursor>> DocumentOut for TextValueOut<B> {
    fn cursor(&mut self) -> &mut ByteCursor {
        &mut self.cursor
    }

    fn value_out(&mut self) -> &mut dyn ValueOut {
        self
    }

    fn filler(&self) -> u8 {
        b' '
    }
}

/// Writes `text` as a double-quoted, escaped string.
pub(crate) fn write_quoted(cursor: &mut ByteCursor, text: &str) {
    cursor.write_byte(b'"');
    let mut utf8 = [0u8; 4];
    for ch in text.chars() {
        match ch {
            '"' => cursor.append("\\\""),
            '\\' => cursor.append("\\\\"),
            '\n' => cursor.append("\\n"),
            '\r' => cursor.append("\\r"),
            '\t' => cursor.append("\\t"),
            '\u{8}' => cursor.append("\\b"),
            '\u{c}' => cursor.append("\\f"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                cursor.append(&format!("\\u{:04x}", c as u32));
            }
            c => cursor.append(c.encode_utf8(&mut utf8)),
        }
    }
    cursor.write_byte(b'"');
}

/// Returns `true` when `text` cannot be written as a plain scalar.
///
/// Keys are always read back as text, so they only need quoting for
/// structural characters.
#[must_use]
pub fn needs_quotes(text: &str, as_key: bool) -> bool {
    let bytes = text.as_bytes();
    let Some(&first) = bytes.first() else {
        return true;
    };
    let last = bytes[bytes.len() - 1];
    if first.is_ascii_whitespace() || last.is_ascii_whitespace() {
        return true;
    }
    if bytes.iter().any(|&b| {
        matches!(
            b,
            b':' | b',' | b'{' | b'}' | b'[' | b']' | b'#' | b'"' | b'\'' | b'\\'
        ) || b < 0x20
            || b == 0x7f
    }) {
        return true;
    }
    if matches!(
        first,
        b'!' | b'&' | b'*' | b'|' | b'>' | b'@' | b'%' | b'`' | b'~'
    ) {
        return true;
    }
    if text == "-" || text.starts_with("- ") {
        return true;
    }
    !as_key && classify_plain(text).is_some()
}

/// The non-text meaning of a plain scalar, if it has one.
pub(crate) fn classify_plain(text: &str) -> Option<Value> {
    match text {
        "null" | "~" => Some(Value::Null),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "NaN" => Some(Value::from(f64::NAN)),
        "Infinity" | "+Infinity" => Some(Value::from(f64::INFINITY)),
        "-Infinity" => Some(Value::from(f64::NEG_INFINITY)),
        _ => parse_number(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wire_value, ValueOutExt};

    fn render(dialect: Dialect, f: impl FnOnce(&mut TextValueOut<&mut ByteCursor>) -> Result<()>) -> String {
        let mut cursor = ByteCursor::new();
        {
            let mut out = TextValueOut::new(&mut cursor, dialect);
            f(&mut out).unwrap();
            out.finish().unwrap();
        }
        String::from_utf8(cursor.as_slice().to_vec()).unwrap()
    }

    fn point() -> Value {
        wire_value!({ "x": 1, "y": [2, 3] })
    }

    #[test]
    fn test_text_layout() {
        let text = render(Dialect::Text, |out| {
            out.event("key")?;
            out.int64(42)?;
            out.event("point")?;
            out.write_value(&point())?;
            out.event("empty")?;
            out.object(|_| Ok(()))
        });
        assert_eq!(
            text,
            "key: 42\npoint: {\n  x: 1,\n  y: [\n    2,\n    3\n  ]\n}\nempty: { }\n"
        );
    }

    #[test]
    fn test_yaml_layout() {
        let text = render(Dialect::Yaml, |out| {
            out.event("point")?;
            out.write_value(&point())?;
            out.event("list")?;
            out.write_value(&wire_value!([{ "a": 1 }, "b"]))?;
            out.event("none")?;
            out.sequence(|_| Ok(()))
        });
        assert_eq!(
            text,
            "point:\n  x: 1\n  y:\n    - 2\n    - 3\nlist:\n  - {a: 1}\n  - b\nnone: []\n"
        );
    }

    #[test]
    fn test_json_layout() {
        let text = render(Dialect::Json, |out| {
            out.event("a")?;
            out.int64(1)?;
            out.event("b")?;
            out.write_value(&wire_value!([2, 3]))
        });
        assert_eq!(text, r#"{"a":1,"b":[2,3]}"#);
    }

    #[test]
    fn test_typed_values() {
        let value = Value::typed("Point", wire_value!({ "x": 1 }));
        let text = render(Dialect::Text, |out| {
            out.event("p")?;
            out.write_value(&value)
        });
        assert_eq!(text, "p: !Point {\n  x: 1\n}\n");

        let yaml = render(Dialect::Yaml, |out| {
            out.event("p")?;
            out.write_value(&value)
        });
        assert_eq!(yaml, "p: !Point {x: 1}\n");

        let mut cursor = ByteCursor::new();
        {
            let mut out = TextValueOut::new(&mut cursor, Dialect::Json).with_use_types(true);
            out.event("p").unwrap();
            out.write_value(&value).unwrap();
            out.finish().unwrap();
        }
        assert_eq!(cursor.as_slice(), br#"{"p":{"@Point":{"x":1}}}"#);

        let plain = render(Dialect::Json, |out| {
            out.event("p")?;
            out.write_value(&value)
        });
        assert_eq!(plain, r#"{"p":{"x":1}}"#);
    }

    #[test]
    fn test_json_non_finite_floats() {
        let text = render(Dialect::Json, |out| {
            out.event("a")?;
            out.float64(f64::NAN)?;
            out.event("b")?;
            out.float32(f32::NAN)?;
            out.event("c")?;
            out.float64(f64::INFINITY)?;
            out.event("d")?;
            out.float32(f32::NEG_INFINITY)
        });
        assert_eq!(
            text,
            r#"{"a":null,"b":null,"c":"Infinity","d":"-Infinity"}"#
        );
    }

    #[test]
    fn test_quoting_rules() {
        assert!(!needs_quotes("hello", false));
        assert!(!needs_quotes("hello world", false));
        assert!(needs_quotes("", false));
        assert!(needs_quotes(" padded", false));
        assert!(needs_quotes("a: b", false));
        assert!(needs_quotes("a,b", false));
        assert!(needs_quotes("# note", false));
        assert!(needs_quotes("42", false));
        assert!(needs_quotes("-1.5", false));
        assert!(needs_quotes("true", false));
        assert!(needs_quotes("null", false));
        assert!(needs_quotes("NaN", false));
        assert!(needs_quotes("!tag", false));
        assert!(needs_quotes("- item", false));
        assert!(needs_quotes("line\nbreak", false));
        assert!(!needs_quotes("42", true));
        assert!(!needs_quotes("-a", false));
    }

    #[test]
    fn test_escapes() {
        let mut cursor = ByteCursor::new();
        write_quoted(&mut cursor, "a\"b\\c\nd\u{1}é");
        assert_eq!(cursor.as_slice(), "\"a\\\"b\\\\c\\nd\\u0001é\"".as_bytes());
    }

    #[test]
    fn test_bytes_and_raw_numbers() {
        let text = render(Dialect::Text, |out| {
            out.event("b")?;
            out.bytes(&[1, 2, 3])?;
            out.event("n")?;
            out.raw_number("1.50")
        });
        assert_eq!(text, "b: !!binary AQID\nn: 1.50\n");
    }

    #[test]
    fn test_misuse_is_reported() {
        let mut cursor = ByteCursor::new();
        let mut out = TextValueOut::new(&mut cursor, Dialect::Json);
        out.int64(1).unwrap();
        assert!(out.field("a").is_err());

        let mut cursor = ByteCursor::new();
        let mut out = TextValueOut::new(&mut cursor, Dialect::Text);
        out.start_object().unwrap();
        assert!(out.int64(1).is_err());
        assert!(out.finish().is_err());
    }
}
