//! Wire Grammars
//!
//! This module documents the byte-level forms the four wires give to the
//! value model, and the framing every document is wrapped in.
//!
//! # Overview
//!
//! One value model (null, bool, integers, floats, text, bytes, objects,
//! sequences and typed values) is rendered by four codecs. Every document
//! is a list of *events*: a name (or a numeric id on binary wires) followed
//! by one value. A document may also hold bare values with no name.
//!
//! | Wire    | Field lookup       | Nesting               | Typed value            |
//! |---------|--------------------|-----------------------|------------------------|
//! | Text    | by name, any order | `{ }` and `[ ]`       | `!Type { ... }`        |
//! | YAML    | by name, any order | indentation, `- `     | `!Type {...}`          |
//! | JSON    | by name, any order | `{ }` and `[ ]`       | `{"@Type": ...}`       |
//! | Binary  | in order only      | length-prefixed       | type-prefix tag        |
//!
//! # Structured Text
//!
//! Events are `name: value` lines. Nested objects and sequences are braced
//! and indented by [`WireOptions::indent`](crate::WireOptions) spaces:
//!
//! ```text
//! key: 42
//! point: {
//!   x: 1,
//!   y: [
//!     2,
//!     3
//!   ]
//! }
//! empty: { }
//! ```
//!
//! `#` starts a comment when it begins a line or follows a space; comments
//! are ignored on read.
//!
//! # YAML-like
//!
//! Objects written as event values are block mappings; sequences are `- `
//! items. Anything nested inside a sequence item or a typed value uses the
//! flow forms `{a: 1}` and `[1, 2]`:
//!
//! ```text
//! point:
//!   x: 1
//!   y:
//!     - 2
//!     - 3
//! list:
//!   - {a: 1}
//!   - b
//! none: []
//! ```
//!
//! The reader accepts block and flow forms anywhere, so both textual wires
//! read each other's output.
//!
//! ## Scalars
//!
//! A plain scalar is text unless it reads as something else:
//!
//! - `null` and `~` are null
//! - `true` and `false` are booleans
//! - `NaN`, `Infinity`, `+Infinity` and `-Infinity` are floats
//! - anything that parses as an integer or a float is a number
//!
//! Text is quoted when it would otherwise be read as one of the above, is
//! empty, has leading or trailing whitespace, contains any of
//! `: , { } [ ] # " ' \` or a control character, or starts with one of
//! `!&*|>@%~` or a backtick. Double quotes support `\" \\ \/ \b \f \n \r \t`
//! and `\uXXXX` with surrogate pairs; single quotes escape a quote as `''`.
//!
//! Raw bytes are written as `!!binary` followed by base64.
//!
//! # JSON
//!
//! A document is one JSON object whose members are its events:
//!
//! ```json
//! {"a":1,"b":[2,3]}
//! ```
//!
//! Non-finite floats have no JSON literal: `NaN` is written as `null` and
//! infinities as the strings `"Infinity"` and `"-Infinity"`, which float
//! reads accept. Bytes
//! are base64 strings. With [`WireOptions::use_types`](crate::WireOptions)
//! a typed value is wrapped as `{"@Point":{"x":1}}`; without it the type is
//! dropped on write and such wrappers are ordinary objects on read.
//!
//! Numbers are handed to the destination verbatim, so copying canonical JSON
//! into the JSON writer reproduces it byte for byte.
//!
//! # Binary
//!
//! Each value starts with a one-byte tag (see
//! [`binary_code`](crate::codec::binary_code)):
//!
//! - `0x00..=0x7F`: the integer itself
//! - `INT8..INT64`, `UINT8..UINT64`: little-endian integers, narrowest first
//! - `FLOAT32`, `FLOAT64`: floats; a `f64` that is exact as `f32` uses 4 bytes
//! - `STRING_0..STRING_31` + bytes, or `STRING_ANY` + `u32` length + bytes
//! - `FIELD_NAME0..FIELD_NAME31` / `FIELD_NAME_ANY` for names,
//!   `FIELD_NUMBER` + `u32` for numeric ids
//! - `NESTED_OBJECT` / `SEQUENCE` + `u32` length + body
//! - `TYPE_PREFIX` + string, then the typed value
//! - `PADDING` and `PADDING32` + `u32` length are skipped wherever a tag may
//!   appear
//!
//! Every tag has a distinct value; this is checked at compile time.
//!
//! # Framing
//!
//! Documents sit back to back in a [`Wire`](crate::Wire), each behind a
//! 4-byte little-endian header:
//!
//! ```text
//! bit 31     not complete
//! bit 30     metadata
//! bits 0-29  body length
//! ```
//!
//! Padding fills the end of a body with the codec's filler byte (space on
//! textual wires, `PADDING` on binary) so the next header is aligned.
//!
//! # CSV
//!
//! Read only. The first line names the columns, which become camelCase field
//! names. Each further line is one document: the first cell is the event
//! name and the rest form an object. Cells may be quoted with `"`, and a
//! doubled `""` is a literal quote.
//!
//! ```text
//! Symbol,Company,Price
//! III,3i Group,479.4
//! ```
//!
//! reads as the event `III: {company: 3i Group, price: 479.4}`.

// This module contains only documentation; no implementation code
