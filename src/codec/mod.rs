//! Concrete wire encodings of the value model.
//!
//! - [`text`]: writer for the structured text, YAML-like and JSON wires
//! - [`text_parser`]: reader for the structured text and YAML-like wires
//! - [`json`]: reader for the JSON wire
//! - [`binary`]: reader and writer for the tagged binary wire
//! - [`binary_code`]: the binary tag table
//! - [`csv`]: read-only CSV ingestion
//!
//! Every reader replays its input into a [`ValueOut`], so translating between
//! wires is one reader driving another wire's writer.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{codec, ByteCursor, WireOptions, WireType};
//!
//! let mut cursor = ByteCursor::new();
//! {
//!     let mut out = codec::document_out(&WireOptions::yaml(), &mut cursor);
//!     codec::copy_to(WireType::Json, &WireOptions::json(), br#"{"a":1,"b":[2,3]}"#, out.value_out())
//!         .unwrap();
//! }
//! assert_eq!(cursor.as_slice(), b"a: 1\nb:\n  - 2\n  - 3\n");
//! ```

pub mod binary;
pub mod binary_code;
pub mod csv;
pub mod json;
pub mod text;
pub mod text_parser;

use crate::{ByteCursor, DocumentOut, FieldKey, Result, Value, ValueBuilder, ValueOut, WireOptions, WireType};
use binary::BinaryValueOut;
use std::ops::DerefMut;
use text::{Dialect, TextValueOut};

/// Deepest nesting of objects, sequences and type prefixes a reader accepts.
pub const MAX_DEPTH: usize = 128;

/// Creates the writer for `options.wire_type` over `cursor`.
///
/// [`WireType::ReadAny`] writes structured text.
pub fn document_out<'a, B>(options: &WireOptions, cursor: B) -> Box<dyn DocumentOut + 'a>
where
    B: DerefMut<Target = ByteCursor> + 'a,
{
    match Dialect::for_wire(options.wire_type) {
        Some(dialect) => Box::new(
            TextValueOut::new(cursor, dialect)
                .with_indent(options.indent)
                .with_use_types(options.use_types),
        ),
        None => Box::new(BinaryValueOut::new(cursor)),
    }
}

/// Guesses the encoding of a document body.
///
/// A first byte outside printable ASCII and whitespace means binary. A body
/// starting with `[`, or with `{` followed by a quoted key or `}`, is JSON.
/// Anything else is read as text, which also covers YAML-like bodies.
#[must_use]
pub fn detect(body: &[u8]) -> WireType {
    match body.first() {
        Some(&b) if b >= 0x80 || b < 0x09 => return WireType::Binary,
        _ => {}
    }
    let mut significant = body.iter().copied().filter(|b| !b.is_ascii_whitespace());
    match significant.next() {
        Some(b'[') => WireType::Json,
        Some(b'{') if matches!(significant.next(), Some(b'"' | b'}')) => WireType::Json,
        _ => WireType::Text,
    }
}

/// Replays a document body of `wire_type` into `out`.
///
/// Returns the wire type actually read, which differs from `wire_type` only
/// for [`WireType::ReadAny`].
pub fn copy_to(
    wire_type: WireType,
    options: &WireOptions,
    body: &[u8],
    out: &mut dyn ValueOut,
) -> Result<WireType> {
    let wire_type = match wire_type {
        WireType::ReadAny => detect(body),
        other => other,
    };
    match wire_type {
        WireType::Binary => binary::copy_to(body, out)?,
        WireType::Json => json::copy_to(body, options.use_types, out)?,
        _ => text_parser::copy_to(body, out)?,
    }
    Ok(wire_type)
}

pub(crate) type Events = Vec<(Option<FieldKey>, Value)>;

/// Decodes a document body into its events.
pub(crate) fn decode(
    wire_type: WireType,
    options: &WireOptions,
    body: &[u8],
) -> Result<(Events, WireType)> {
    let mut builder = ValueBuilder::new();
    let read = copy_to(wire_type, options, body, &mut builder)?;
    Ok((builder.into_events()?, read))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection() {
        assert_eq!(detect(&[binary_code::FIELD_NAME0 + 1, b'a', 1]), WireType::Binary);
        assert_eq!(detect(&[binary_code::PADDING]), WireType::Binary);
        assert_eq!(detect(br#"{"a":1}"#), WireType::Json);
        assert_eq!(detect(b"  [1, 2]"), WireType::Json);
        assert_eq!(detect(b"{ }"), WireType::Json);
        assert_eq!(detect(b"{\n  x: 1\n}\n"), WireType::Text);
        assert_eq!(detect(b"key: 42\n"), WireType::Text);
        assert_eq!(detect(b""), WireType::Text);
    }

    #[test]
    fn test_read_any_decodes_each_wire() {
        let options = WireOptions::new().with_wire_type(WireType::ReadAny);
        for (body, expected) in [
            (&b"key: 42\n"[..], WireType::Text),
            (&br#"{"key":42}"#[..], WireType::Json),
            (&[binary_code::FIELD_NAME0 + 3, b'k', b'e', b'y', 42][..], WireType::Binary),
        ] {
            let (events, read) = decode(WireType::ReadAny, &options, body).unwrap();
            assert_eq!(read, expected);
            assert_eq!(events, vec![(Some(FieldKey::Name("key".into())), Value::from(42))]);
        }
    }
}
