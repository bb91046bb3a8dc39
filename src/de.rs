//! Conversion from the wire value model into Rust data.
//!
//! [`ValueDeserializer`] is a `serde::Deserializer` that reads a [`Value`].
//! Every wire decodes into a `Value` first; typed reads such as
//! [`ValueIn::object`](crate::ValueIn::object) finish here.
//!
//! Scalars are read leniently: textual wires and CSV rows hand numbers over
//! as text in some positions, so numeric and boolean requests parse `Text`
//! values. A `null` read as a float is `NaN`. Explicit type wrappers are
//! transparent to typed requests (structs, maps, scalars); checking the type
//! name against the target is the caller's job. Self-describing requests
//! (`deserialize_any`) see a wrapper as the one-entry map `{"@Type": value}`,
//! the same form [`Value`] serializes it to, so a `Value` read back keeps
//! its types.
//!
//! ## Examples
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_wire::{from_value, wire_value};
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let p: Point = from_value(wire_value!({ "x": 1, "y": "2" })).unwrap();
//! assert_eq!(p, Point { x: 1, y: 2 });
//! ```

use crate::{Error, FieldMap, Number, Result, Value};
use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Deserializes a `T` from a [`Value`].
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] when the value's shape cannot become a
/// `T`, or [`Error::MissingField`] for absent struct fields.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: de::DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// A `serde::Deserializer` over an owned [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }

    fn into_untyped(self) -> Self {
        ValueDeserializer {
            value: strip_types(self.value),
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::type_mismatch(expected, self.value.untyped().kind())
    }

    fn parse_text<T: std::str::FromStr>(&self, text: &str, expected: &str) -> Result<T> {
        text.trim()
            .parse()
            .map_err(|_| Error::type_mismatch(expected, &format!("text {:?}", text)))
    }

    fn signed(&self) -> Result<i64> {
        match self.value.untyped() {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| Error::type_mismatch("integer", &n.to_string())),
            Value::Text(s) => self.parse_text(s, "integer"),
            _ => Err(self.mismatch("integer")),
        }
    }

    fn unsigned(&self) -> Result<u64> {
        match self.value.untyped() {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| Error::type_mismatch("unsigned integer", &n.to_string())),
            Value::Text(s) => self.parse_text(s, "unsigned integer"),
            _ => Err(self.mismatch("unsigned integer")),
        }
    }

    fn float(&self) -> Result<f64> {
        match self.value.untyped() {
            Value::Number(n) => Ok(n.as_f64()),
            Value::Null => Ok(f64::NAN),
            Value::Text(s) => match s.trim() {
                "NaN" | "null" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => self.parse_text(other, "float"),
            },
            _ => Err(self.mismatch("float")),
        }
    }
}

/// Drops `Typed` wrappers at this level only; nested ones are handled as
/// they are reached.
fn strip_types(value: Value) -> Value {
    match value {
        Value::Typed { value, .. } => strip_types(*value),
        other => other,
    }
}

macro_rules! forward_untyped {
    ($($method:ident)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                self.into_untyped().deserialize_any(visitor)
            }
        )*
    };
}

macro_rules! deserialize_signed {
    ($($method:ident => $visit:ident: $t:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                let v = self.signed()?;
                let narrowed = <$t>::try_from(v)
                    .map_err(|_| Error::type_mismatch(stringify!($t), &v.to_string()))?;
                visitor.$visit(narrowed)
            }
        )*
    };
}

macro_rules! deserialize_unsigned {
    ($($method:ident => $visit:ident: $t:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                let v = self.unsigned()?;
                let narrowed = <$t>::try_from(v)
                    .map_err(|_| Error::type_mismatch(stringify!($t), &v.to_string()))?;
                visitor.$visit(narrowed)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(Number::Int(i)) => visitor.visit_i64(i),
            Value::Number(Number::UInt(u)) => visitor.visit_u64(u),
            Value::Number(Number::Float(f)) => visitor.visit_f64(f),
            Value::Text(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Sequence(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Object(obj) => visitor.visit_map(MapDeserializer::new(obj)),
            Value::Typed { type_name, value } => {
                let mut wrapper = FieldMap::with_capacity(1);
                wrapper.insert(format!("@{}", type_name), *value);
                visitor.visit_map(MapDeserializer::new(wrapper))
            }
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value.untyped() {
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Text(s) => visitor.visit_bool(self.parse_text(s, "bool")?),
            _ => Err(self.mismatch("bool")),
        }
    }

    deserialize_signed! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
    }

    deserialize_unsigned! {
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_f32(self.float()? as f32)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_f64(self.float()?)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match strip_types(self.value) {
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Text(s) => visitor.visit_byte_buf(s.into_bytes()),
            Value::Sequence(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            other => Err(Error::type_mismatch("bytes", other.kind())),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value.untyped() {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match strip_types(self.value) {
            Value::Text(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: None,
            }),
            Value::Object(obj) if obj.len() == 1 => {
                let mut fields = obj.into_iter();
                match fields.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value: Some(value),
                    }),
                    None => Err(Error::type_mismatch("enum", "empty object")),
                }
            }
            other => Err(Error::type_mismatch("enum", other.kind())),
        }
    }

    forward_untyped! {
        deserialize_char deserialize_str deserialize_string deserialize_unit
        deserialize_seq deserialize_map deserialize_identifier
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.into_untyped().deserialize_any(visitor)
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.into_untyped().deserialize_any(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.into_untyped().deserialize_any(visitor)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.into_untyped().deserialize_any(visitor)
    }

    forward_to_deserialize_any! {
        i128 u128 ignored_any
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: FieldMap) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::Text(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let name: de::value::StringDeserializer<Error> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            Some(other) => Err(Error::type_mismatch("unit variant", other.kind())),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::type_mismatch("newtype variant", "unit variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value.map(strip_types) {
            Some(Value::Sequence(items)) => visitor.visit_seq(SeqDeserializer::new(items)),
            Some(other) => Err(Error::type_mismatch("tuple variant", other.kind())),
            None => Err(Error::type_mismatch("tuple variant", "unit variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value.map(strip_types) {
            Some(Value::Object(obj)) => visitor.visit_map(MapDeserializer::new(obj)),
            Some(other) => Err(Error::type_mismatch("struct variant", other.kind())),
            None => Err(Error::type_mismatch("struct variant", "unit variant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_value, wire_value};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Event {
        Heartbeat,
        Price(f64),
        Fill { qty: u32, px: f64 },
    }

    #[test]
    fn test_enum_round_trip_through_value() {
        for event in [
            Event::Heartbeat,
            Event::Price(1.25),
            Event::Fill { qty: 5, px: 99.5 },
        ] {
            let value = to_value(&event).unwrap();
            let back: Event = from_value(value).unwrap();
            assert_eq!(back, event);
        }
    }

    #[test]
    fn test_text_scalars_parse() {
        let n: i32 = from_value(Value::from(" 42 ")).unwrap();
        assert_eq!(n, 42);
        let f: f64 = from_value(Value::from("1.5")).unwrap();
        assert_eq!(f, 1.5);
        let b: bool = from_value(Value::from("true")).unwrap();
        assert!(b);
    }

    #[test]
    fn test_null_float_is_nan() {
        let f: f64 = from_value(Value::Null).unwrap();
        assert!(f.is_nan());
        let missing: Option<i64> = from_value(Value::Null).unwrap();
        assert_eq!(missing, None);
        assert!(from_value::<i64>(Value::Null).is_err());
    }

    #[test]
    fn test_narrowing_overflow_is_a_mismatch() {
        let err = from_value::<u8>(Value::from(300)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_typed_wrapper_is_transparent() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Point {
            x: i32,
        }
        let v = Value::typed("Point", wire_value!({ "x": 3 }));
        assert_eq!(from_value::<Point>(v).unwrap(), Point { x: 3 });
    }

    #[test]
    fn test_value_target_keeps_type_wrappers() {
        let mut fields = FieldMap::new();
        fields.insert(
            "position".to_string(),
            Value::typed("Point", wire_value!({ "x": 3 })),
        );
        fields.insert(
            "nested".to_string(),
            Value::typed("Outer", Value::typed("Inner", wire_value!([1, 2]))),
        );
        fields.insert("empty".to_string(), wire_value!({}));
        let v = Value::Object(fields);
        let back: Value = from_value(v.clone()).unwrap();
        assert_eq!(back, v);

        let top = Value::typed("Point", wire_value!({ "x": 3 }));
        assert_eq!(from_value::<Value>(top.clone()).unwrap(), top);
    }

    #[test]
    fn test_typed_scalar_reads_as_scalar() {
        let n: i64 = from_value(Value::typed("Id", Value::from(7))).unwrap();
        assert_eq!(n, 7);
        let s: String = from_value(Value::typed("Name", Value::from("x"))).unwrap();
        assert_eq!(s, "x");
        let none: Option<i64> = from_value(Value::typed("Id", Value::Null)).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_missing_field_error() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Needs {
            a: i32,
            b: i32,
        }
        let err = from_value::<Needs>(wire_value!({ "a": 1 })).unwrap_err();
        assert!(matches!(err, Error::MissingField(ref f) if f == "b"));
    }
}
