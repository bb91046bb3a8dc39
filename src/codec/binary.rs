//! The compact tagged binary wire.
//!
//! Each value is one tag byte (see [`binary_code`](super::binary_code))
//! followed by a fixed-width or length-prefixed payload. Integers use the
//! narrowest tag that holds them, and doubles that survive a round trip
//! through `f32` are written in four bytes. Nested objects and sequences
//! carry their byte length, patched in when they close, so a reader can
//! verify each one ends where it claims to.

use super::binary_code as code;
use super::MAX_DEPTH;
use crate::out::parse_number;
use crate::{ByteCursor, DocumentOut, Error, Number, Result, Value, ValueOut};
use std::ops::DerefMut;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Open {
    Object,
    Sequence,
}

/// Writes binary values into a [`ByteCursor`].
pub struct BinaryValueOut<B> {
    cursor: B,
    open: Vec<(usize, Open)>,
}

impl<B: DerefMut<Target = ByteCursor>> BinaryValueOut<B> {
    pub fn new(cursor: B) -> Self {
        BinaryValueOut {
            cursor,
            open: Vec::new(),
        }
    }

    pub fn into_inner(self) -> B {
        self.cursor
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| Error::custom(format!("{} bytes exceed the binary length limit", len)))?;
        self.cursor.write_u32_le(len);
        Ok(())
    }

    fn write_short_or_any(&mut self, short: u8, any: u8, bytes: &[u8]) -> Result<()> {
        if bytes.len() <= code::SHORT_LEN_MAX {
            self.cursor.write_byte(short + bytes.len() as u8);
        } else {
            self.cursor.write_byte(any);
            self.write_len(bytes.len())?;
        }
        self.cursor.write_slice(bytes);
        Ok(())
    }

    fn open(&mut self, tag: u8, kind: Open) {
        self.cursor.write_byte(tag);
        let at = self.cursor.write_position();
        self.cursor.write_u32_le(0);
        self.open.push((at, kind));
    }

    fn close(&mut self, kind: Open) -> Result<()> {
        let (at, opened) = self
            .open
            .pop()
            .ok_or_else(|| Error::custom("close without a matching open"))?;
        if opened != kind {
            return Err(Error::custom("mismatched close of object or sequence"));
        }
        let len = self.cursor.write_position() - at - 4;
        let len = u32::try_from(len)
            .map_err(|_| Error::custom(format!("{} bytes exceed the binary length limit", len)))?;
        if !self.cursor.write_u32_le_at(at, len) {
            return Err(Error::custom("length placeholder was truncated"));
        }
        Ok(())
    }
}

impl<B: DerefMut<Target = ByteCursor>> ValueOut for BinaryValueOut<B> {
    fn is_binary(&self) -> bool {
        true
    }

    fn field(&mut self, name: &str) -> Result<()> {
        self.write_short_or_any(code::FIELD_NAME0, code::FIELD_NAME_ANY, name.as_bytes())
    }

    fn field_id(&mut self, id: u32) -> Result<()> {
        self.cursor.write_byte(code::FIELD_NUMBER);
        self.cursor.write_u32_le(id);
        Ok(())
    }

    fn type_prefix(&mut self, type_name: &str) -> Result<()> {
        self.cursor.write_byte(code::TYPE_PREFIX);
        self.write_short_or_any(code::STRING_0, code::STRING_ANY, type_name.as_bytes())
    }

    fn null(&mut self) -> Result<()> {
        self.cursor.write_byte(code::NULL);
        Ok(())
    }

    fn bool(&mut self, value: bool) -> Result<()> {
        self.cursor
            .write_byte(if value { code::TRUE } else { code::FALSE });
        Ok(())
    }

    fn int64(&mut self, value: i64) -> Result<()> {
        let cursor = &mut *self.cursor;
        if (0..=code::SMALL_INT_MAX as i64).contains(&value) {
            cursor.write_byte(value as u8);
        } else if let Ok(v) = i8::try_from(value) {
            cursor.write_byte(code::INT8);
            cursor.write_slice(&v.to_le_bytes());
        } else if let Ok(v) = u8::try_from(value) {
            cursor.write_byte(code::UINT8);
            cursor.write_byte(v);
        } else if let Ok(v) = i16::try_from(value) {
            cursor.write_byte(code::INT16);
            cursor.write_slice(&v.to_le_bytes());
        } else if let Ok(v) = u16::try_from(value) {
            cursor.write_byte(code::UINT16);
            cursor.write_slice(&v.to_le_bytes());
        } else if let Ok(v) = i32::try_from(value) {
            cursor.write_byte(code::INT32);
            cursor.write_slice(&v.to_le_bytes());
        } else if let Ok(v) = u32::try_from(value) {
            cursor.write_byte(code::UINT32);
            cursor.write_slice(&v.to_le_bytes());
        } else {
            cursor.write_byte(code::INT64);
            cursor.write_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    fn uint64(&mut self, value: u64) -> Result<()> {
        match i64::try_from(value) {
            Ok(v) => self.int64(v),
            Err(_) => {
                self.cursor.write_byte(code::UINT64);
                self.cursor.write_slice(&value.to_le_bytes());
                Ok(())
            }
        }
    }

    fn float32(&mut self, value: f32) -> Result<()> {
        self.cursor.write_byte(code::FLOAT32);
        self.cursor.write_slice(&value.to_le_bytes());
        Ok(())
    }

    fn float64(&mut self, value: f64) -> Result<()> {
        let narrow = value as f32;
        if value.is_nan() || narrow as f64 == value {
            return self.float32(narrow);
        }
        self.cursor.write_byte(code::FLOAT64);
        self.cursor.write_slice(&value.to_le_bytes());
        Ok(())
    }

    fn text(&mut self, value: &str) -> Result<()> {
        self.write_short_or_any(code::STRING_0, code::STRING_ANY, value.as_bytes())
    }

    fn bytes(&mut self, value: &[u8]) -> Result<()> {
        self.cursor.write_byte(code::U8_ARRAY);
        self.write_len(value.len())?;
        self.cursor.write_slice(value);
        Ok(())
    }

    fn raw_number(&mut self, literal: &str) -> Result<()> {
        match parse_number(literal) {
            Some(Value::Number(Number::Int(i))) => self.int64(i),
            Some(Value::Number(Number::UInt(u))) => self.uint64(u),
            Some(Value::Number(Number::Float(f))) => self.float64(f),
            _ => Err(Error::type_mismatch("number", &format!("{:?}", literal))),
        }
    }

    fn start_object(&mut self) -> Result<()> {
        self.open(code::NESTED_OBJECT, Open::Object);
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.close(Open::Object)
    }

    fn start_sequence(&mut self) -> Result<()> {
        self.open(code::SEQUENCE, Open::Sequence);
        Ok(())
    }

    fn end_sequence(&mut self) -> Result<()> {
        self.close(Open::Sequence)
    }

    fn finish(&mut self) -> Result<()> {
        if self.open.is_empty() {
            Ok(())
        } else {
            Err(Error::custom("unterminated object or sequence"))
        }
    }
}

impl<B: DerefMut<Target = ByteCursor>> DocumentOut for BinaryValueOut<B> {
    fn cursor(&mut self) -> &mut ByteCursor {
        &mut self.cursor
    }

    fn value_out(&mut self) -> &mut dyn ValueOut {
        self
    }

    fn filler(&self) -> u8 {
        code::PADDING
    }
}

/// Replays a binary document body into `out`.
///
/// Top-level entries are either a field name or id followed by a value
/// (an event), or a bare value. Padding bytes are skipped.
///
/// # Errors
///
/// [`Error::MalformedInput`] for unknown tags, truncated payloads, invalid
/// UTF-8, or a nested value whose length disagrees with its content.
pub fn copy_to(input: &[u8], out: &mut dyn ValueOut) -> Result<()> {
    let mut reader = Reader {
        input,
        pos: 0,
        depth: 0,
    };
    loop {
        reader.skip_padding()?;
        let Some(tag) = reader.peek() else {
            return Ok(());
        };
        reader.copy_field(tag, out)?;
        reader.copy_value(out)?;
    }
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn error(&self, msg: &str) -> Error {
        Error::malformed(self.peek(), self.pos, msg)
    }

    /// Called with `pos` just past the tag that opens the nested value.
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let at = self.pos - 1;
            return Err(Error::malformed(self.input.get(at).copied(), at, "nesting too deep"));
        }
        Ok(())
    }

    fn next(&mut self) -> Result<u8> {
        let byte = self
            .peek()
            .ok_or_else(|| self.error("truncated binary value"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| Error::malformed(None, self.input.len(), "truncated binary payload"))?;
        let input = self.input;
        let bytes = &input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut word = [0u8; N];
        word.copy_from_slice(self.take(N)?);
        Ok(word)
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.array()?) as usize)
    }

    fn utf8(&mut self, len: usize) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|e| {
            Error::malformed(
                bytes.get(e.valid_up_to()).copied(),
                start + e.valid_up_to(),
                "invalid UTF-8 in string",
            )
        })
    }

    fn skip_padding(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(code::PADDING) => self.pos += 1,
                Some(code::PADDING32) => {
                    self.pos += 1;
                    let len = self.read_len()?;
                    self.take(len)?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consumes a field name or id if one starts at `tag`.
    fn copy_field(&mut self, tag: u8, out: &mut dyn ValueOut) -> Result<bool> {
        match tag {
            code::FIELD_NAME0..=code::FIELD_NAME31 => {
                self.pos += 1;
                let name = self.utf8((tag - code::FIELD_NAME0) as usize)?;
                out.field(name)?;
            }
            code::FIELD_NAME_ANY => {
                self.pos += 1;
                let len = self.read_len()?;
                let name = self.utf8(len)?;
                out.field(name)?;
            }
            code::FIELD_NUMBER => {
                self.pos += 1;
                out.field_id(u32::from_le_bytes(self.array()?))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn read_string(&mut self) -> Result<&'a str> {
        match self.next()? {
            tag @ code::STRING_0..=code::STRING_31 => self.utf8((tag - code::STRING_0) as usize),
            code::STRING_ANY => {
                let len = self.read_len()?;
                self.utf8(len)
            }
            _ => {
                self.pos -= 1;
                Err(self.error("expected a type name"))
            }
        }
    }

    fn nested_end(&mut self) -> Result<usize> {
        let len = self.read_len()?;
        let end = self.pos + len;
        if end > self.input.len() {
            return Err(Error::malformed(
                None,
                self.input.len(),
                "nested value longer than its document",
            ));
        }
        Ok(end)
    }

    fn copy_value(&mut self, out: &mut dyn ValueOut) -> Result<()> {
        self.skip_padding()?;
        let tag = self.next()?;
        match tag {
            0..=code::SMALL_INT_MAX => out.int64(tag as i64),
            code::NULL => out.null(),
            code::TRUE => out.bool(true),
            code::FALSE => out.bool(false),
            code::INT8 => out.int8(i8::from_le_bytes(self.array()?)),
            code::INT16 => out.int16(i16::from_le_bytes(self.array()?)),
            code::INT32 => out.int32(i32::from_le_bytes(self.array()?)),
            code::INT64 => out.int64(i64::from_le_bytes(self.array()?)),
            code::UINT8 => out.uint8(self.next()?),
            code::UINT16 => out.uint16(u16::from_le_bytes(self.array()?)),
            code::UINT32 => out.uint32(u32::from_le_bytes(self.array()?)),
            code::UINT64 => out.uint64(u64::from_le_bytes(self.array()?)),
            code::FLOAT32 => out.float32(f32::from_le_bytes(self.array()?)),
            code::FLOAT64 => out.float64(f64::from_le_bytes(self.array()?)),
            code::STRING_0..=code::STRING_31 => {
                let text = self.utf8((tag - code::STRING_0) as usize)?;
                out.text(text)
            }
            code::STRING_ANY => {
                let len = self.read_len()?;
                let text = self.utf8(len)?;
                out.text(text)
            }
            code::U8_ARRAY => {
                let len = self.read_len()?;
                out.bytes(self.take(len)?)
            }
            code::TYPE_PREFIX => {
                self.enter()?;
                let name = self.read_string()?;
                out.type_prefix(name)?;
                self.copy_value(out)?;
                self.depth -= 1;
                Ok(())
            }
            code::NESTED_OBJECT => {
                self.enter()?;
                let end = self.nested_end()?;
                out.start_object()?;
                while self.pos < end {
                    let tag = self.next()?;
                    self.pos -= 1;
                    if !self.copy_field(tag, out)? {
                        return Err(self.error("expected a field name"));
                    }
                    self.copy_value(out)?;
                }
                self.expect_end(end)?;
                self.depth -= 1;
                out.end_object()
            }
            code::SEQUENCE => {
                self.enter()?;
                let end = self.nested_end()?;
                out.start_sequence()?;
                while self.pos < end {
                    self.copy_value(out)?;
                }
                self.expect_end(end)?;
                self.depth -= 1;
                out.end_sequence()
            }
            _ => {
                self.pos -= 1;
                Err(Error::malformed(
                    Some(tag),
                    self.pos,
                    &format!("unexpected {} tag", code::name_of(tag)),
                ))
            }
        }
    }

    fn expect_end(&self, end: usize) -> Result<()> {
        if self.pos == end {
            Ok(())
        } else {
            Err(Error::malformed(
                self.input.get(end).copied(),
                end,
                "nested value overran its declared length",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wire_value, ValueBuilder, ValueOutExt};

    fn encode(value: &Value) -> Vec<u8> {
        let mut cursor = ByteCursor::new();
        let mut out = BinaryValueOut::new(&mut cursor);
        out.write_value(value).unwrap();
        out.finish().unwrap();
        cursor.as_slice().to_vec()
    }

    fn decode(bytes: &[u8]) -> Value {
        let mut builder = ValueBuilder::new();
        copy_to(bytes, &mut builder).unwrap();
        builder.into_value().unwrap()
    }

    #[test]
    fn test_narrowest_integer_tags() {
        assert_eq!(encode(&Value::from(5)), vec![5]);
        assert_eq!(encode(&Value::from(-1)), vec![code::INT8, 0xFF]);
        assert_eq!(encode(&Value::from(200)), vec![code::UINT8, 200]);
        assert_eq!(encode(&Value::from(-300))[0], code::INT16);
        assert_eq!(encode(&Value::from(40_000))[0], code::UINT16);
        assert_eq!(encode(&Value::from(3_000_000_000i64))[0], code::UINT32);
        assert_eq!(encode(&Value::from(i64::MIN))[0], code::INT64);
        assert_eq!(encode(&Value::from(u64::MAX))[0], code::UINT64);
    }

    #[test]
    fn test_float_narrowing() {
        assert_eq!(encode(&Value::from(1.5))[0], code::FLOAT32);
        assert_eq!(encode(&Value::from(0.1))[0], code::FLOAT64);
        assert_eq!(decode(&encode(&Value::from(0.1))), Value::from(0.1));
        assert_eq!(decode(&encode(&Value::from(1.5))), Value::from(1.5));
    }

    #[test]
    fn test_short_and_long_strings() {
        assert_eq!(encode(&Value::from("abc")), vec![code::STRING_0 + 3, b'a', b'b', b'c']);
        let long = "x".repeat(40);
        let bytes = encode(&Value::from(long.as_str()));
        assert_eq!(bytes[0], code::STRING_ANY);
        assert_eq!(decode(&bytes), Value::from(long.as_str()));
    }

    #[test]
    fn test_nested_round_trip() {
        let value = Value::typed(
            "Quote",
            wire_value!({
                "symbol": "EURUSD",
                "levels": [1, (-2), 3.25, null, true],
                "meta": { "blob": "text" }
            }),
        );
        assert_eq!(decode(&encode(&value)), value);
    }

    #[test]
    fn test_events_and_padding() {
        let mut cursor = ByteCursor::new();
        {
            let mut out = BinaryValueOut::new(&mut cursor);
            out.event("a").unwrap();
            out.int64(1).unwrap();
            out.event_id("top", 116).unwrap();
            out.text("b").unwrap();
        }
        cursor.write_byte(code::PADDING);
        cursor.write_byte(code::PADDING);

        let mut builder = ValueBuilder::new();
        copy_to(cursor.as_slice(), &mut builder).unwrap();
        let events = builder.into_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].0, Some(crate::FieldKey::Id(116)));
    }

    #[test]
    fn test_malformed_inputs() {
        let mut builder = ValueBuilder::new();
        let err = copy_to(&[0x80], &mut builder).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { byte: Some(0x80), offset: 0, .. }));

        let mut builder = ValueBuilder::new();
        let err = copy_to(&[code::STRING_0 + 5, b'a'], &mut builder).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));

        // nested object claims 10 bytes but only has 2
        let mut builder = ValueBuilder::new();
        let err = copy_to(&[code::NESTED_OBJECT, 10, 0, 0, 0, 0xC1, b'a'], &mut builder).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_raw_numbers_are_parsed() {
        let mut cursor = ByteCursor::new();
        let mut out = BinaryValueOut::new(&mut cursor);
        out.raw_number("42").unwrap();
        out.raw_number("2.5").unwrap();
        assert!(out.raw_number("abc").is_err());
        assert_eq!(cursor.as_slice(), &[42, code::FLOAT32, 0, 0, 0x20, 0x40]);
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let nested = |levels: usize| {
            let mut bytes = Vec::with_capacity(levels * 5);
            for level in 0..levels {
                bytes.push(code::SEQUENCE);
                bytes.extend_from_slice(&((5 * (levels - level - 1)) as u32).to_le_bytes());
            }
            bytes
        };
        let mut builder = ValueBuilder::new();
        assert!(copy_to(&nested(MAX_DEPTH), &mut builder).is_ok());

        let mut builder = ValueBuilder::new();
        let err = copy_to(&nested(200_000), &mut builder).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput { byte: Some(code::SEQUENCE), offset, .. } if offset == 5 * MAX_DEPTH
        ));

        let prefixes: Vec<u8> = [code::TYPE_PREFIX, code::STRING_0 + 1, b'T']
            .repeat(200_000)
            .into_iter()
            .chain([1])
            .collect();
        let mut builder = ValueBuilder::new();
        assert!(matches!(
            copy_to(&prefixes, &mut builder),
            Err(Error::MalformedInput { .. })
        ));
    }
}
