//! The format-agnostic read side of the value model.
//!
//! A decoded document is a [`DocumentIn`]: its events in the order they were
//! framed. Each event's value is handed out as a [`ValueIn`], whose accessors
//! check the value's shape against what the caller asks for.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{DocumentWriter, Wire, WireOptions, ValueOutExt};
//!
//! let wire = Wire::new(WireOptions::text());
//! wire.write_document(false, |out| {
//!     out.event("key")?;
//!     out.int64(42)
//! }).unwrap();
//!
//! let mut doc = wire.reading_document().unwrap().unwrap();
//! assert_eq!(doc.read("key").unwrap().int64().unwrap(), 42);
//! assert!(!doc.has_more());
//! ```

use crate::out::events_to_value;
use crate::{from_value, Error, FieldKey, LongConverter, Number, Result, TypeRegistry, Value, WireType};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// One decoded value, read through typed accessors.
///
/// Numeric accessors also accept numeric text, which is how CSV cells and
/// compact identifiers arrive. A `null` reads as `NaN` through the float
/// accessors; the integer accessors report it as a mismatch and the `opt_*`
/// variants return `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueIn {
    value: Value,
    lenient_numbers: bool,
}

macro_rules! narrow_accessors {
    ($($name:ident => $t:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> Result<$t> {
                let v = self.int64()?;
                <$t>::try_from(v).map_err(|_| Error::type_mismatch(stringify!($t), &v.to_string()))
            }
        )*
    };
}

impl ValueIn {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueIn {
            value,
            lenient_numbers: false,
        }
    }

    /// Float accessors answer `0.0` (with a warning) for objects and
    /// sequences instead of failing.
    #[must_use]
    pub fn with_lenient_numbers(mut self, lenient: bool) -> Self {
        self.lenient_numbers = lenient;
        self
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.untyped().is_null()
    }

    /// The explicit type name written before this value, if any.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.value.type_name()
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::type_mismatch(expected, self.value.kind())
    }

    pub fn bool(&self) -> Result<bool> {
        match self.value.untyped() {
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.mismatch("bool")),
            },
            _ => Err(self.mismatch("bool")),
        }
    }

    pub fn int64(&self) -> Result<i64> {
        self.opt_int64()?.ok_or_else(|| self.mismatch("int64"))
    }

    /// Like [`int64`](Self::int64), with `null` read as `None`.
    pub fn opt_int64(&self) -> Result<Option<i64>> {
        match self.value.untyped() {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::type_mismatch("int64", &n.to_string())),
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Error::type_mismatch("int64", &format!("text {:?}", s))),
            _ => Err(self.mismatch("int64")),
        }
    }

    narrow_accessors! {
        int8 => i8,
        int16 => i16,
        int32 => i32,
        uint8 => u8,
        uint16 => u16,
        uint32 => u32,
    }

    pub fn uint64(&self) -> Result<u64> {
        match self.value.untyped() {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| Error::type_mismatch("uint64", &n.to_string())),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::type_mismatch("uint64", &format!("text {:?}", s))),
            _ => Err(self.mismatch("uint64")),
        }
    }

    pub fn float64(&self) -> Result<f64> {
        match self.value.untyped() {
            Value::Number(n) => Ok(n.as_f64()),
            Value::Null => Ok(f64::NAN),
            Value::Text(s) => match s.trim() {
                "null" | "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse()
                    .map_err(|_| Error::type_mismatch("float64", &format!("text {:?}", s))),
            },
            Value::Object(_) | Value::Sequence(_) if self.lenient_numbers => {
                warn!(
                    found = self.value.kind(),
                    "Expected a number but found a structure, reading 0"
                );
                Ok(0.0)
            }
            _ => Err(self.mismatch("float64")),
        }
    }

    pub fn float32(&self) -> Result<f32> {
        self.float64().map(|v| v as f32)
    }

    pub fn text(&self) -> Result<String> {
        self.opt_text()?.ok_or_else(|| self.mismatch("text"))
    }

    /// Like [`text`](Self::text), with `null` read as `None`.
    ///
    /// Numbers and booleans are rendered as text.
    pub fn opt_text(&self) -> Result<Option<String>> {
        match self.value.untyped() {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            _ => Err(self.mismatch("text")),
        }
    }

    /// Raw bytes; wires without a bytes type carry them as base64 text.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        match self.value.untyped() {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => STANDARD
                .decode(s.trim())
                .map_err(|_| Error::type_mismatch("bytes", "non-base64 text")),
            _ => Err(self.mismatch("bytes")),
        }
    }

    /// Parses a compact identifier written with
    /// [`write_long`](crate::ValueOutExt::write_long).
    pub fn read_long(&self, converter: &dyn LongConverter) -> Result<i64> {
        match self.value.untyped() {
            Value::Text(s) => converter.parse(s),
            Value::Number(Number::Int(i)) => Ok(*i),
            Value::Number(Number::UInt(u)) => Ok(*u as i64),
            // plain scalars that happen to look numeric
            Value::Number(n) => converter.parse(&n.to_string()),
            Value::Bool(b) => converter.parse(&b.to_string()),
            Value::Null => Ok(0),
            _ => Err(self.mismatch("compact identifier")),
        }
    }

    pub fn sequence(&self) -> Result<SequenceIn> {
        match self.value.untyped() {
            Value::Sequence(items) => Ok(SequenceIn {
                items: items.clone().into_iter(),
                lenient_numbers: self.lenient_numbers,
            }),
            _ => Err(self.mismatch("sequence")),
        }
    }

    /// Reads the fields of a nested object as `(name, value)` pairs.
    pub fn fields(&self) -> Result<Vec<(String, ValueIn)>> {
        match self.value.untyped() {
            Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), self.child(v.clone())))
                .collect()),
            _ => Err(self.mismatch("object")),
        }
    }

    fn child(&self, value: Value) -> ValueIn {
        ValueIn {
            value,
            lenient_numbers: self.lenient_numbers,
        }
    }

    /// Decodes into `T`, ignoring any explicit type name.
    pub fn marshallable<T: DeserializeOwned>(&self) -> Result<T> {
        from_value(self.value.clone())
    }

    /// Decodes into `T`.
    ///
    /// An explicit type name must resolve in `registry` and name `T`;
    /// without one, `T` is authoritative.
    ///
    /// # Errors
    ///
    /// [`Error::TypeResolution`] for unknown names, [`Error::TypeMismatch`]
    /// when the name belongs to another type or the shape does not fit.
    pub fn object<T>(&self, registry: &TypeRegistry) -> Result<T>
    where
        T: DeserializeOwned + 'static,
    {
        if let Some(name) = self.value.type_name() {
            let entry = registry.resolve(name)?;
            if !entry.is::<T>() {
                return Err(Error::type_mismatch(std::any::type_name::<T>(), entry.rust_name()));
            }
        }
        self.marshallable()
    }

    /// Decodes into an existing slot, replacing its contents.
    pub fn object_into<T>(&self, using: &mut T, registry: &TypeRegistry) -> Result<()>
    where
        T: DeserializeOwned + 'static,
    {
        *using = self.object(registry)?;
        Ok(())
    }

    /// Instantiates whatever type the explicit type name resolves to.
    pub fn object_any(&self, registry: &TypeRegistry) -> Result<Box<dyn Any + Send>> {
        match &self.value {
            Value::Typed { type_name, value } => registry.instantiate(type_name, (**value).clone()),
            other => Err(Error::type_mismatch("typed object", other.kind())),
        }
    }
}

/// Iterates the items of a sequence.
#[derive(Debug)]
pub struct SequenceIn {
    items: std::vec::IntoIter<Value>,
    lenient_numbers: bool,
}

impl SequenceIn {
    #[must_use]
    pub fn has_next_sequence_item(&self) -> bool {
        self.items.len() > 0
    }

    /// # Errors
    ///
    /// [`Error::ExhaustedSequence`] once every item has been read.
    pub fn next_item(&mut self) -> Result<ValueIn> {
        self.items
            .next()
            .map(|value| ValueIn {
                value,
                lenient_numbers: self.lenient_numbers,
            })
            .ok_or(Error::ExhaustedSequence)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl Iterator for SequenceIn {
    type Item = ValueIn;

    fn next(&mut self) -> Option<ValueIn> {
        self.next_item().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

/// The decoded events of one document, read in order or by name.
#[derive(Clone, Debug)]
pub struct DocumentIn {
    events: Vec<(Option<FieldKey>, Value)>,
    position: usize,
    wire_type: WireType,
    lenient_numbers: bool,
}

impl DocumentIn {
    #[must_use]
    pub fn new(events: Vec<(Option<FieldKey>, Value)>, wire_type: WireType) -> Self {
        DocumentIn {
            events,
            position: 0,
            wire_type,
            lenient_numbers: false,
        }
    }

    pub(crate) fn with_lenient_numbers(mut self, lenient: bool) -> Self {
        self.lenient_numbers = lenient;
        self
    }

    fn wrap(&self, value: Value) -> ValueIn {
        ValueIn {
            value,
            lenient_numbers: self.lenient_numbers,
        }
    }

    /// Returns `true` while unread events remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.position < self.events.len()
    }

    /// Reads the next event in framing order.
    pub fn read_event(&mut self) -> Option<(Option<FieldKey>, ValueIn)> {
        let (key, value) = self.events.get(self.position)?.clone();
        self.position += 1;
        Some((key, self.wrap(value)))
    }

    /// Reads the event called `name`.
    ///
    /// Wires with named lookup search the whole document, starting after the
    /// last event read; binary documents only match the next event.
    ///
    /// # Errors
    ///
    /// [`Error::MissingField`] when no such event can be read.
    pub fn read(&mut self, name: &str) -> Result<ValueIn> {
        let matches = |key: &Option<FieldKey>| key.as_ref().map_or(false, |k| k.is(name));
        let found = if self.wire_type.supports_random_fields() {
            (self.position..self.events.len())
                .chain(0..self.position)
                .find(|&i| matches(&self.events[i].0))
        } else {
            Some(self.position).filter(|&i| i < self.events.len() && matches(&self.events[i].0))
        };
        let index = found.ok_or_else(|| Error::missing_field(name))?;
        self.position = index + 1;
        Ok(self.wrap(self.events[index].1.clone()))
    }

    /// Decodes the first event called `event`, or `None` if there is none.
    pub fn extract<T: DeserializeOwned>(&self, event: &str) -> Result<Option<T>> {
        self.events
            .iter()
            .find(|(key, _)| key.as_ref().map_or(false, |k| k.is(event)))
            .map(|(_, value)| from_value(value.clone()))
            .transpose()
    }

    #[must_use]
    pub fn events(&self) -> &[(Option<FieldKey>, Value)] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Collapses the events into a single value.
    ///
    /// See [`ValueBuilder::into_value`](crate::ValueBuilder::into_value).
    #[must_use]
    pub fn into_value(self) -> Value {
        events_to_value(self.events)
    }
}

/// A document taken off a [`Wire`](crate::Wire), with its framing details.
#[derive(Clone, Debug)]
pub struct ReadDocument {
    meta: bool,
    span: std::ops::Range<usize>,
    input: DocumentIn,
}

impl ReadDocument {
    pub(crate) fn new(meta: bool, span: std::ops::Range<usize>, input: DocumentIn) -> Self {
        ReadDocument { meta, span, input }
    }

    #[must_use]
    pub fn is_meta_data(&self) -> bool {
        self.meta
    }

    /// Byte range the document occupied, header included.
    #[must_use]
    pub fn span(&self) -> std::ops::Range<usize> {
        self.span.clone()
    }

    #[must_use]
    pub fn into_input(self) -> DocumentIn {
        self.input
    }
}

impl Deref for ReadDocument {
    type Target = DocumentIn;

    fn deref(&self) -> &DocumentIn {
        &self.input
    }
}

impl DerefMut for ReadDocument {
    fn deref_mut(&mut self) -> &mut DocumentIn {
        &mut self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wire_value, BASE85};
    use serde::{Deserialize, Serialize};

    fn doc(wire_type: WireType) -> DocumentIn {
        DocumentIn::new(
            vec![
                (Some("a".into()), Value::from(1)),
                (Some("b".into()), Value::from("two")),
                (Some(FieldKey::Id(7)), Value::Null),
            ],
            wire_type,
        )
    }

    #[test]
    fn test_named_lookup_on_text() {
        let mut d = doc(WireType::Text);
        assert_eq!(d.read("b").unwrap().text().unwrap(), "two");
        assert_eq!(d.read("a").unwrap().int64().unwrap(), 1);
        assert!(matches!(d.read("zz"), Err(Error::MissingField(_))));
    }

    #[test]
    fn test_binary_lookup_is_sequential() {
        let mut d = doc(WireType::Binary);
        assert!(d.read("b").is_err());
        assert_eq!(d.read("a").unwrap().int64().unwrap(), 1);
        assert_eq!(d.read("b").unwrap().text().unwrap(), "two");
        let (key, value) = d.read_event().unwrap();
        assert_eq!(key, Some(FieldKey::Id(7)));
        assert!(value.is_null());
        assert!(!d.has_more());
    }

    #[test]
    fn test_null_handling() {
        let null = ValueIn::new(Value::Null);
        assert!(null.float64().unwrap().is_nan());
        assert!(null.float32().unwrap().is_nan());
        assert!(matches!(null.int64(), Err(Error::TypeMismatch { .. })));
        assert_eq!(null.opt_int64().unwrap(), None);
        assert_eq!(null.opt_text().unwrap(), None);
        assert!(ValueIn::new(Value::from("null")).float64().unwrap().is_nan());
    }

    #[test]
    fn test_shape_mismatch() {
        let obj = ValueIn::new(wire_value!({ "a": 1 }));
        assert!(matches!(obj.int64(), Err(Error::TypeMismatch { .. })));
        assert!(matches!(obj.float64(), Err(Error::TypeMismatch { .. })));
        assert_eq!(obj.clone().with_lenient_numbers(true).float64().unwrap(), 0.0);
        assert!(obj.sequence().is_err());
    }

    #[test]
    fn test_sequence_exhaustion() {
        let seq = ValueIn::new(wire_value!([1, 2]));
        let mut items = seq.sequence().unwrap();
        assert_eq!(items.next_item().unwrap().int64().unwrap(), 1);
        assert!(items.has_next_sequence_item());
        assert_eq!(items.next_item().unwrap().int64().unwrap(), 2);
        assert!(!items.has_next_sequence_item());
        assert!(matches!(items.next_item(), Err(Error::ExhaustedSequence)));
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(ValueIn::new(Value::from(200)).uint8().unwrap(), 200);
        assert!(ValueIn::new(Value::from(200)).int8().is_err());
        assert_eq!(ValueIn::new(Value::from("-5")).int32().unwrap(), -5);
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Other {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_typed_object_resolution() {
        let mut registry = TypeRegistry::new();
        registry.register::<Point>("Point").unwrap();
        registry.register::<Other>("Other").unwrap();

        let typed = ValueIn::new(Value::typed("Point", wire_value!({ "x": 1, "y": 2 })));
        assert_eq!(typed.object::<Point>(&registry).unwrap(), Point { x: 1, y: 2 });
        assert!(matches!(
            typed.object::<Other>(&registry),
            Err(Error::TypeMismatch { .. })
        ));

        let mut slot = Point::default();
        typed.object_into(&mut slot, &registry).unwrap();
        assert_eq!(slot, Point { x: 1, y: 2 });

        let any = typed.object_any(&registry).unwrap();
        assert!(any.downcast_ref::<Point>().is_some());

        let unknown = ValueIn::new(Value::typed("Nope", wire_value!({ "x": 1, "y": 2 })));
        assert!(matches!(
            unknown.object::<Point>(&registry),
            Err(Error::TypeResolution(_))
        ));

        // without a prefix the requested type is authoritative
        let plain = ValueIn::new(wire_value!({ "x": 3, "y": 4 }));
        assert_eq!(plain.object::<Other>(&registry).unwrap(), Other { x: 3, y: 4 });
    }

    #[test]
    fn test_read_long_and_bytes() {
        let id = BASE85.parse("abcd").unwrap();
        let v = ValueIn::new(Value::from("abcd"));
        assert_eq!(v.read_long(&BASE85).unwrap(), id);
        assert_eq!(ValueIn::new(Value::from(id)).read_long(&BASE85).unwrap(), id);

        let b = ValueIn::new(Value::from("AQID"));
        assert_eq!(b.bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_extract_first_match() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Msg {
            n: i32,
        }
        let d = DocumentIn::new(
            vec![
                (Some("skip".into()), Value::from(0)),
                (Some("msg".into()), wire_value!({ "n": 1 })),
                (Some("msg".into()), wire_value!({ "n": 2 })),
            ],
            WireType::Json,
        );
        assert_eq!(d.extract::<Msg>("msg").unwrap(), Some(Msg { n: 1 }));
        assert_eq!(d.extract::<Msg>("none").unwrap(), None);
    }
}
