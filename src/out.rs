//! The format-agnostic write side of the value model.
//!
//! [`ValueOut`] is the contract every codec implements: one call per scalar,
//! open/close calls for composites, and naming calls for fields and explicit
//! types. Call sites never know which wire they are writing.
//!
//! The scoped helpers on [`ValueOutExt`] are how callers should build
//! composites: [`object`](ValueOutExt::object) and
//! [`sequence`](ValueOutExt::sequence) always emit the closing marker, even
//! when the callback fails.
//!
//! [`ValueBuilder`] is the in-memory implementation. Readers replay wire
//! bytes into it to produce [`Value`]s.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{ValueBuilder, ValueOut, ValueOutExt, Value};
//!
//! let mut builder = ValueBuilder::new();
//! builder.field("point").unwrap();
//! builder
//!     .object(|out| {
//!         out.field("x")?;
//!         out.int64(1)?;
//!         out.field("y")?;
//!         out.int64(2)
//!     })
//!     .unwrap();
//!
//! let value = builder.into_value().unwrap();
//! assert_eq!(value.get("point").and_then(|p| p.get("y")), Some(&Value::from(2)));
//! ```

use crate::{to_value, ByteCursor, Error, FieldMap, LongConverter, Number, Result, TypeRegistry, Value};
use serde::Serialize;
use std::fmt;

/// Names a top-level event or field: textual, or a small numeric id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name(String),
    Id(u32),
}

impl FieldKey {
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            FieldKey::Name(name) => Some(name),
            FieldKey::Id(_) => None,
        }
    }

    #[must_use]
    pub fn as_id(&self) -> Option<u32> {
        match self {
            FieldKey::Id(id) => Some(*id),
            FieldKey::Name(_) => None,
        }
    }

    /// Returns `true` if this key is the textual `name`.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.as_name() == Some(name)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => f.write_str(name),
            FieldKey::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        FieldKey::Name(name.to_string())
    }
}

impl From<u32> for FieldKey {
    fn from(id: u32) -> Self {
        FieldKey::Id(id)
    }
}

/// Writes values in a format-agnostic way.
///
/// A field is named with [`field`](Self::field) and then given exactly one
/// value. At the top level of a document a named value is an *event*.
/// Writing a value without a name at the top level writes a bare value.
pub trait ValueOut {
    /// Returns `true` when this writer produces tagged binary.
    fn is_binary(&self) -> bool {
        false
    }

    /// Names the next value.
    fn field(&mut self, name: &str) -> Result<()>;

    /// Names the next value with a numeric id.
    ///
    /// Textual writers render the id as its decimal name.
    fn field_id(&mut self, id: u32) -> Result<()>;

    /// Declares the concrete type of the next value.
    fn type_prefix(&mut self, type_name: &str) -> Result<()>;

    fn null(&mut self) -> Result<()>;

    fn bool(&mut self, value: bool) -> Result<()>;

    fn int8(&mut self, value: i8) -> Result<()> {
        self.int64(value as i64)
    }

    fn int16(&mut self, value: i16) -> Result<()> {
        self.int64(value as i64)
    }

    fn int32(&mut self, value: i32) -> Result<()> {
        self.int64(value as i64)
    }

    fn int64(&mut self, value: i64) -> Result<()>;

    fn uint8(&mut self, value: u8) -> Result<()> {
        self.int64(value as i64)
    }

    fn uint16(&mut self, value: u16) -> Result<()> {
        self.int64(value as i64)
    }

    fn uint32(&mut self, value: u32) -> Result<()> {
        self.int64(value as i64)
    }

    fn uint64(&mut self, value: u64) -> Result<()>;

    fn float32(&mut self, value: f32) -> Result<()> {
        self.float64(value as f64)
    }

    fn float64(&mut self, value: f64) -> Result<()>;

    fn text(&mut self, value: &str) -> Result<()>;

    fn bytes(&mut self, value: &[u8]) -> Result<()>;

    /// Writes a numeric literal copied from another wire.
    ///
    /// Textual writers emit it verbatim; others parse it.
    fn raw_number(&mut self, literal: &str) -> Result<()>;

    fn start_object(&mut self) -> Result<()>;

    fn end_object(&mut self) -> Result<()>;

    fn start_sequence(&mut self) -> Result<()>;

    fn end_sequence(&mut self) -> Result<()>;

    /// Completes the output, closing anything the format opens implicitly.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Names a top-level event.
    fn event(&mut self, name: &str) -> Result<()> {
        self.field(name)
    }

    /// Names a top-level event by id on binary writers, by name otherwise.
    fn event_id(&mut self, name: &str, id: u32) -> Result<()> {
        if self.is_binary() {
            self.field_id(id)
        } else {
            self.field(name)
        }
    }
}

/// Scoped and typed helpers available on every [`ValueOut`].
pub trait ValueOutExt: ValueOut {
    /// Writes a nested object whose fields are produced by `f`.
    ///
    /// The object is closed even when `f` fails; `f`'s error is returned.
    fn object<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.start_object()?;
        let written = f(self);
        let closed = self.end_object();
        written.and(closed)
    }

    /// Writes a sequence whose items are produced by `f`.
    ///
    /// The sequence is closed even when `f` fails; `f`'s error is returned.
    fn sequence<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.start_sequence()?;
        let written = f(self);
        let closed = self.end_sequence();
        written.and(closed)
    }

    /// Replays a dynamic value.
    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.null(),
            Value::Bool(b) => self.bool(*b),
            Value::Number(Number::Int(i)) => self.int64(*i),
            Value::Number(Number::UInt(u)) => self.uint64(*u),
            Value::Number(Number::Float(f)) => self.float64(*f),
            Value::Text(s) => self.text(s),
            Value::Bytes(b) => self.bytes(b),
            Value::Object(map) => self.object(|out| {
                for (name, field) in map {
                    out.field(name)?;
                    out.write_value(field)?;
                }
                Ok(())
            }),
            Value::Sequence(items) => self.sequence(|out| {
                for item in items {
                    out.write_value(item)?;
                }
                Ok(())
            }),
            Value::Typed { type_name, value } => {
                self.type_prefix(type_name)?;
                self.write_value(value)
            }
        }
    }

    /// Writes any `Serialize` type through the value model.
    fn marshallable<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = to_value(value)?;
        self.write_value(&value)
    }

    /// Writes `value` preceded by the type name it is registered under.
    ///
    /// # Errors
    ///
    /// [`Error::TypeResolution`] if `T` was never registered.
    fn typed_marshallable<T>(&mut self, registry: &TypeRegistry, value: &T) -> Result<()>
    where
        T: Serialize + 'static,
    {
        let name = registry
            .name_of::<T>()
            .ok_or_else(|| Error::type_resolution(std::any::type_name::<T>()))?;
        self.type_prefix(name)?;
        self.marshallable(value)
    }

    /// Writes `value` as compact text, or as a plain integer on binary wires.
    fn write_long(&mut self, converter: &dyn LongConverter, value: i64) -> Result<()> {
        if self.is_binary() {
            self.int64(value)
        } else {
            self.text(&converter.as_string(value))
        }
    }
}

impl<T: ValueOut + ?Sized> ValueOutExt for T {}

/// A [`ValueOut`] that owns the buffer it writes a framed document into.
pub trait DocumentOut: ValueOut {
    fn cursor(&mut self) -> &mut ByteCursor;

    fn value_out(&mut self) -> &mut dyn ValueOut;

    /// Byte appended to a document body to pad it.
    fn filler(&self) -> u8;
}

enum Slot {
    Top(Option<FieldKey>),
    Field(String),
    Item,
}

enum Partial {
    Object { map: FieldMap, key: Option<String> },
    Sequence(Vec<Value>),
}

struct Frame {
    partial: Partial,
    slot: Slot,
    type_name: Option<String>,
}

/// Builds [`Value`]s from [`ValueOut`] calls.
///
/// Top-level named values are collected as events.
#[derive(Default)]
pub struct ValueBuilder {
    events: Vec<(Option<FieldKey>, Value)>,
    stack: Vec<Frame>,
    pending_key: Option<FieldKey>,
    pending_type: Option<String>,
}

impl ValueBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The completed top-level events, in write order.
    ///
    /// # Errors
    ///
    /// Fails if a composite is still open or a name has no value.
    pub fn into_events(self) -> Result<Vec<(Option<FieldKey>, Value)>> {
        if !self.stack.is_empty() {
            return Err(Error::custom("unterminated object or sequence"));
        }
        if let Some(key) = self.pending_key {
            return Err(Error::custom(format!("event '{}' has no value", key)));
        }
        Ok(self.events)
    }

    /// Collapses the events into one value.
    ///
    /// A single unnamed value is returned as is; named events become the
    /// fields of an object (numeric ids as decimal names); several unnamed
    /// values become a sequence. No events at all is an empty object.
    pub fn into_value(self) -> Result<Value> {
        Ok(events_to_value(self.into_events()?))
    }

    fn take_slot(&mut self) -> Result<Slot> {
        match self.stack.last_mut() {
            None => Ok(Slot::Top(self.pending_key.take())),
            Some(Frame {
                partial: Partial::Object { key, .. },
                ..
            }) => key
                .take()
                .map(Slot::Field)
                .ok_or_else(|| Error::custom("object value written without a field name")),
            Some(Frame {
                partial: Partial::Sequence(_),
                ..
            }) => Ok(Slot::Item),
        }
    }

    fn put(&mut self, slot: Slot, value: Value) -> Result<()> {
        match (slot, self.stack.last_mut()) {
            (Slot::Top(key), None) => {
                self.events.push((key, value));
                Ok(())
            }
            (
                Slot::Field(name),
                Some(Frame {
                    partial: Partial::Object { map, .. },
                    ..
                }),
            ) => {
                map.insert(name, value);
                Ok(())
            }
            (
                Slot::Item,
                Some(Frame {
                    partial: Partial::Sequence(items),
                    ..
                }),
            ) => {
                items.push(value);
                Ok(())
            }
            _ => Err(Error::custom("value does not match the enclosing composite")),
        }
    }

    fn emit(&mut self, value: Value) -> Result<()> {
        let slot = self.take_slot()?;
        let value = match self.pending_type.take() {
            Some(type_name) => Value::typed(type_name, value),
            None => value,
        };
        self.put(slot, value)
    }

    fn open(&mut self, partial: Partial) -> Result<()> {
        let slot = self.take_slot()?;
        let type_name = self.pending_type.take();
        self.stack.push(Frame {
            partial,
            slot,
            type_name,
        });
        Ok(())
    }

    fn close(&mut self, expect_object: bool) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::custom("close without a matching open"))?;
        let value = match frame.partial {
            Partial::Object { map, key } if expect_object => {
                if let Some(key) = key {
                    return Err(Error::custom(format!("field '{}' has no value", key)));
                }
                Value::Object(map)
            }
            Partial::Sequence(items) if !expect_object => Value::Sequence(items),
            _ => return Err(Error::custom("mismatched close of object or sequence")),
        };
        let value = match frame.type_name {
            Some(type_name) => Value::typed(type_name, value),
            None => value,
        };
        self.put(frame.slot, value)
    }
}

pub(crate) fn events_to_value(events: Vec<(Option<FieldKey>, Value)>) -> Value {
    if events.len() == 1 && events[0].0.is_none() {
        return events.into_iter().next().map(|(_, v)| v).unwrap_or_default();
    }
    if events.is_empty() {
        return Value::Object(FieldMap::new());
    }
    if events.iter().all(|(key, _)| key.is_none()) {
        return Value::Sequence(events.into_iter().map(|(_, v)| v).collect());
    }
    Value::Object(
        events
            .into_iter()
            .map(|(key, v)| (key.map(|k| k.to_string()).unwrap_or_default(), v))
            .collect(),
    )
}

pub(crate) fn parse_number(literal: &str) -> Option<Value> {
    if let Ok(i) = literal.parse::<i64>() {
        return Some(Value::Number(Number::Int(i)));
    }
    if let Ok(u) = literal.parse::<u64>() {
        return Some(Value::Number(Number::UInt(u)));
    }
    let trimmed = literal.strip_prefix('+').unwrap_or(literal);
    if trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'.' | b'e' | b'E' | b'+'))
    {
        trimmed.parse::<f64>().ok().map(Value::from)
    } else {
        None
    }
}

impl ValueOut for ValueBuilder {
    fn field(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                self.pending_key = Some(FieldKey::Name(name.to_string()));
                Ok(())
            }
            Some(Frame {
                partial: Partial::Object { key, .. },
                ..
            }) => {
                *key = Some(name.to_string());
                Ok(())
            }
            Some(_) => Err(Error::custom(format!(
                "field '{}' written inside a sequence",
                name
            ))),
        }
    }

    fn field_id(&mut self, id: u32) -> Result<()> {
        if self.stack.is_empty() {
            self.pending_key = Some(FieldKey::Id(id));
            Ok(())
        } else {
            self.field(&id.to_string())
        }
    }

    fn type_prefix(&mut self, type_name: &str) -> Result<()> {
        self.pending_type = Some(type_name.to_string());
        Ok(())
    }

    fn null(&mut self) -> Result<()> {
        self.emit(Value::Null)
    }

    fn bool(&mut self, value: bool) -> Result<()> {
        self.emit(Value::Bool(value))
    }

    fn int64(&mut self, value: i64) -> Result<()> {
        self.emit(Value::from(value))
    }

    fn uint64(&mut self, value: u64) -> Result<()> {
        self.emit(Value::from(value))
    }

    fn float64(&mut self, value: f64) -> Result<()> {
        self.emit(Value::from(value))
    }

    fn text(&mut self, value: &str) -> Result<()> {
        self.emit(Value::Text(value.to_string()))
    }

    fn bytes(&mut self, value: &[u8]) -> Result<()> {
        self.emit(Value::Bytes(value.to_vec()))
    }

    fn raw_number(&mut self, literal: &str) -> Result<()> {
        let value = parse_number(literal)
            .ok_or_else(|| Error::type_mismatch("number", &format!("{:?}", literal)))?;
        self.emit(value)
    }

    fn start_object(&mut self) -> Result<()> {
        self.open(Partial::Object {
            map: FieldMap::new(),
            key: None,
        })
    }

    fn end_object(&mut self) -> Result<()> {
        self.close(true)
    }

    fn start_sequence(&mut self) -> Result<()> {
        self.open(Partial::Sequence(Vec::new()))
    }

    fn end_sequence(&mut self) -> Result<()> {
        self.close(false)
    }
}
