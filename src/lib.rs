//! # serde_wire
//!
//! A self-describing serialization engine: one value model rendered as
//! structured text, a YAML-like form, compact tagged binary or JSON, with
//! lossless translation between them, and a framing protocol that stores
//! discrete documents in a shared buffer.
//!
//! ## Key Features
//!
//! - **Four wires, one model**: write through [`ValueOut`], read through
//!   [`ValueIn`]; the call site never depends on the encoding
//! - **Translation**: every reader replays into any writer, so JSON can be
//!   copied into binary or YAML without an intermediate tree
//! - **Framed documents**: a [`Wire`] delimits documents with a length header,
//!   serializes writers with a timed lock and rolls back failed writes
//! - **Method dispatch**: [`MethodWriter`] and [`MethodReader`] turn
//!   single-argument calls into documents and back
//! - **Compact identifiers**: [`LongConverter`]s map `i64` to short text in a
//!   fixed alphabet ([`BASE85`], [`BASE64`], ...)
//! - **Serde Compatible**: any `#[derive(Serialize, Deserialize)]` type can be
//!   written and read
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_wire::{from_yaml, to_yaml};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Quote {
//!     symbol: String,
//!     price: f64,
//!     sizes: Vec<u32>,
//! }
//!
//! let quote = Quote { symbol: "III".to_string(), price: 479.4, sizes: vec![100, 200] };
//! let yaml = to_yaml(&quote).unwrap();
//! assert_eq!(yaml, "symbol: III\nprice: 479.4\nsizes:\n  - 100\n  - 200\n");
//!
//! let back: Quote = from_yaml(&yaml).unwrap();
//! assert_eq!(back, quote);
//! ```
//!
//! ### Documents on a Wire
//!
//! ```rust
//! use serde_wire::{DocumentWriter, ValueOutExt, Wire, WireOptions};
//!
//! let wire = Wire::new(WireOptions::text());
//! wire.write_document(false, |out| {
//!     out.event("trade")?;
//!     out.object(|out| {
//!         out.field("qty")?;
//!         out.int64(300)
//!     })
//! })
//! .unwrap();
//!
//! let mut doc = wire.reading_document().unwrap().unwrap();
//! let trade = doc.read("trade").unwrap();
//! assert_eq!(trade.fields().unwrap()[0].1.int64().unwrap(), 300);
//! ```
//!
//! ### Translating Between Wires
//!
//! ```rust
//! use serde_wire::{translate, WireOptions};
//!
//! let json = br#"{"a":1,"b":[2,3]}"#;
//! let binary = translate(json, &WireOptions::json(), &WireOptions::binary()).unwrap();
//! let back = translate(&binary, &WireOptions::binary(), &WireOptions::json()).unwrap();
//! assert_eq!(back, json);
//! ```
//!
//! ### Dynamic Values with wire_value! Macro
//!
//! ```rust
//! use serde_wire::{wire_value, Value};
//!
//! let data = wire_value!({
//!     "symbol": "III",
//!     "bids": [479.4, 479.2]
//! });
//!
//! if let Value::Object(obj) = data {
//!     assert_eq!(obj.get("symbol").and_then(|v| v.as_str()), Some("III"));
//! }
//! ```
//!
//! ## Concurrency
//!
//! A [`Wire`] is `Sync`. Writers on different threads each get whole
//! documents; bytes of two documents never interleave. Readers and writers
//! scoped to one document ([`ValueOut`], [`ValueIn`]) belong to the thread
//! that opened it.
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Proper error propagation with `Result` types
//! - Malformed input is reported with the offending byte and its offset
//!
//! ## Format Details
//!
//! See the [`grammar`] module for the byte-level form of each wire.

pub mod codec;
pub mod converter;
pub mod cursor;
pub mod de;
pub mod document;
pub mod error;
pub mod grammar;
pub mod input;
pub mod macros;
pub mod map;
pub mod method;
pub mod options;
pub mod out;
pub mod registry;
pub mod ser;
pub mod system;
pub mod value;

pub use codec::csv::CsvSource;
pub use converter::{
    LongConverter, NanoTimestampConverter, RadixConverter, BASE16, BASE32, BASE40, BASE64, BASE85,
};
pub use cursor::ByteCursor;
pub use de::{from_value, ValueDeserializer};
pub use document::{DocumentReader, DocumentWriter, Wire, WriteDocument};
pub use error::{Error, Result};
pub use input::{DocumentIn, ReadDocument, SequenceIn, ValueIn};
pub use map::FieldMap;
pub use method::{Contract, ContractBuilder, Method, MethodReader, MethodReaderBuilder, MethodWriter};
pub use options::{Padding, WireOptions, WireType, CACHE_LINE_SIZE, HEADER_SIZE};
pub use out::{DocumentOut, FieldKey, ValueBuilder, ValueOut, ValueOutExt};
pub use registry::{RegisteredType, TypeRegistry};
pub use ser::{to_value, ValueSerializer};
pub use system::SystemContext;
pub use value::{Number, Value};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize any `T: Serialize` as structured text.
///
/// A struct or map becomes one event per field; anything else is written
/// as a single bare value.
///
/// # Examples
///
/// ```rust
/// use serde_wire::to_text;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_text(&Point { x: 1, y: 2 }).unwrap(), "x: 1\ny: 2\n");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_text<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with(value, &WireOptions::text())
}

/// Serialize any `T: Serialize` in the YAML-like form.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_yaml<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with(value, &WireOptions::yaml())
}

/// Serialize any `T: Serialize` as JSON.
///
/// # Examples
///
/// ```rust
/// use serde_wire::to_json;
///
/// assert_eq!(to_json(&vec![1, 2]).unwrap(), "[1,2]");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_json<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with(value, &WireOptions::json())
}

/// Serialize any `T: Serialize` as tagged binary.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_binary<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_bytes_with(value, &WireOptions::binary())
}

/// Serialize any `T: Serialize` on the wire chosen by `options`.
///
/// The output is a bare document body, without a framing header.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes_with<T>(value: &T, options: &WireOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let value = to_value(value)?;
    let mut cursor = ByteCursor::new();
    {
        let mut out = codec::document_out(options, &mut cursor);
        match &value {
            Value::Object(fields) => {
                for (name, field) in fields {
                    out.event(name)?;
                    out.write_value(field)?;
                }
            }
            other => out.write_value(other)?,
        }
        out.finish()?;
    }
    Ok(cursor.as_slice().to_vec())
}

fn to_string_with<T>(value: &T, options: &WireOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let bytes = to_bytes_with(value, options)?;
    String::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))
}

/// Deserialize an instance of type `T` from structured text.
///
/// # Examples
///
/// ```rust
/// use serde_wire::from_text;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_text("x: 1\ny: 2\n").unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_text<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_slice_with(s.as_bytes(), &WireOptions::text())
}

/// Deserialize an instance of type `T` from the YAML-like form.
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_yaml<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_slice_with(s.as_bytes(), &WireOptions::yaml())
}

/// Deserialize an instance of type `T` from JSON.
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_json<T>(s: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_slice_with(s.as_bytes(), &WireOptions::json())
}

/// Deserialize an instance of type `T` from tagged binary.
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_binary<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    from_slice_with(bytes, &WireOptions::binary())
}

/// Deserialize an instance of type `T` from a document body on the wire
/// chosen by `options`; [`WireType::ReadAny`] detects it.
///
/// # Errors
///
/// Returns an error if the input is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_with<T>(bytes: &[u8], options: &WireOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    let (events, _) = codec::decode(options.wire_type, options, bytes)?;
    from_value(out::events_to_value(events))
}

/// Re-encodes a document body from one wire to another.
///
/// No intermediate value tree is built: the reader for `from` drives the
/// writer for `to` directly.
///
/// # Errors
///
/// Returns an error if the input is malformed for `from`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn translate(bytes: &[u8], from: &WireOptions, to: &WireOptions) -> Result<Vec<u8>> {
    let mut cursor = ByteCursor::new();
    {
        let mut out = codec::document_out(to, &mut cursor);
        codec::copy_to(from.wire_type, from, bytes, out.value_out())?;
        out.finish()?;
    }
    Ok(cursor.as_slice().to_vec())
}
