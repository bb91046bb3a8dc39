/// Builds a wire [`Value`](crate::Value) from a JSON-like literal.
///
/// Fields keep the order they are written in. An object whose only field is
/// `"@Type"` is a typed value, as in JSON written with type wrappers.
/// Negative numbers and other expressions go in parentheses and are
/// converted through [`to_value`](crate::to_value).
///
/// # Examples
///
/// ```rust
/// use serde_wire::{to_text, wire_value};
///
/// let quote = wire_value!({
///     "symbol": "III",
///     "bid": 479.4,
///     "change": (-1.5),
///     "venue": { "@Venue": { "mic": "XLON" } }
/// });
/// assert_eq!(quote.get("venue").and_then(|v| v.type_name()), Some("Venue"));
/// assert!(to_text(&quote).unwrap().contains("venue: !Venue {"));
/// ```
#[macro_export]
macro_rules! wire_value {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Sequence(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Sequence(vec![$($crate::wire_value!($elem)),*])
    };

    ({}) => {
        $crate::Value::Object($crate::FieldMap::new())
    };

    ({ $($name:literal : $value:tt),* $(,)? }) => {{
        let mut fields = $crate::FieldMap::new();
        $(
            fields.insert($name.to_string(), $crate::wire_value!($value));
        )*
        $crate::Value::object(fields)
    }};

    ($other:expr) => {
        $crate::to_value(&$other).unwrap_or($crate::Value::Null)
    };
}

#[cfg(test)]
mod tests {
    use crate::{FieldMap, Number, Value};

    #[test]
    fn test_scalars() {
        assert_eq!(wire_value!(null), Value::Null);
        assert_eq!(wire_value!(true), Value::Bool(true));
        assert_eq!(wire_value!(42), Value::Number(Number::Int(42)));
        assert_eq!(wire_value!((-42)), Value::Number(Number::Int(-42)));
        assert_eq!(wire_value!(479.4), Value::Number(Number::Float(479.4)));
        assert_eq!(wire_value!("III"), Value::Text("III".to_string()));
    }

    #[test]
    fn test_typed_values() {
        let venue = wire_value!({ "@Venue": { "mic": "XLON" } });
        assert_eq!(venue, Value::typed("Venue", wire_value!({ "mic": "XLON" })));

        let ids = wire_value!([{ "@Id": 1 }, { "@Id": 2 }]);
        assert_eq!(
            ids.as_sequence().map(|s| s.iter().all(Value::is_typed)),
            Some(true)
        );

        let nested = wire_value!({ "at": { "@Outer": { "@Inner": [] } } });
        assert_eq!(
            nested.get("at"),
            Some(&Value::typed("Outer", Value::typed("Inner", wire_value!([]))))
        );
    }

    #[test]
    fn test_fields_keep_write_order() {
        let quote = wire_value!({ "symbol": "III", "bid": 479.4, "ask": 479.5, "book": {} });
        assert!(wire_value!({ "@a": 1, "b": 2 }).is_object());
        let names: Vec<_> = quote.as_object().map(|f| f.keys().cloned().collect()).unwrap_or_default();
        assert_eq!(names, vec!["symbol", "bid", "ask", "book"]);
        assert_eq!(quote.get("book"), Some(&Value::Object(FieldMap::new())));
    }
}
