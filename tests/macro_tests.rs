use serde_wire::codec::text::needs_quotes;
use serde_wire::{wire_value, FieldMap, Number, Value};

#[test]
fn test_wire_value_macro_null() {
    let value = wire_value!(null);
    assert_eq!(value, Value::Null);
}

#[test]
fn test_wire_value_macro_booleans() {
    assert_eq!(wire_value!(true), Value::Bool(true));
    assert_eq!(wire_value!(false), Value::Bool(false));
}

#[test]
fn test_wire_value_macro_numbers() {
    assert_eq!(wire_value!(42), Value::Number(Number::Int(42)));
    assert_eq!(wire_value!(3.5), Value::Number(Number::Float(3.5)));
    assert_eq!(wire_value!(-123), Value::Number(Number::Int(-123)));
    assert_eq!(wire_value!(u64::MAX), Value::Number(Number::UInt(u64::MAX)));
}

#[test]
fn test_wire_value_macro_text() {
    assert_eq!(wire_value!("hello world"), Value::Text("hello world".to_string()));
    assert_eq!(wire_value!(""), Value::Text(String::new()));
}

#[test]
fn test_wire_value_macro_sequences() {
    assert_eq!(wire_value!([]), Value::Sequence(vec![]));

    let mixed = wire_value!([1, "hello", true, null, (-7)]);
    assert_eq!(
        mixed,
        Value::Sequence(vec![
            Value::Number(Number::Int(1)),
            Value::Text("hello".to_string()),
            Value::Bool(true),
            Value::Null,
            Value::Number(Number::Int(-7)),
        ])
    );
}

#[test]
fn test_wire_value_macro_nested() {
    let nested = wire_value!({
        "quote": {
            "symbol": "III",
            "price": 479.4
        },
        "venues": ["LSE", "CHIX"],
        "count": 42
    });

    let obj = nested.as_object().unwrap();
    assert_eq!(obj.len(), 3);
    let keys: Vec<_> = obj.keys().cloned().collect();
    assert_eq!(keys, vec!["quote", "venues", "count"]);

    let quote = nested.get("quote").unwrap();
    assert_eq!(quote.get("symbol").and_then(Value::as_str), Some("III"));
    assert_eq!(quote.get("price").and_then(Value::as_f64), Some(479.4));
    assert_eq!(
        nested.get("venues").and_then(Value::as_sequence).map(Vec::len),
        Some(2)
    );
    assert_eq!(wire_value!({}), Value::Object(FieldMap::new()));
}

#[test]
fn test_value_predicates() {
    let null_val = wire_value!(null);
    assert!(null_val.is_null());
    assert!(!null_val.is_bool());
    assert!(!null_val.is_number());
    assert!(!null_val.is_text());
    assert!(!null_val.is_sequence());
    assert!(!null_val.is_object());
    assert!(!null_val.is_typed());

    let typed = Value::typed("Point", wire_value!({ "x": 1 }));
    assert!(typed.is_typed());
    assert_eq!(typed.type_name(), Some("Point"));
    assert!(typed.untyped().is_object());
    assert_eq!(typed.get("x").and_then(Value::as_i64), Some(1));

    assert!(Value::Bytes(vec![1, 2]).is_bytes());
    assert_eq!(wire_value!([1, 2, 3]).as_sequence().map(Vec::len), Some(3));
}

#[test]
fn test_text_quoting_needs() {
    assert!(!needs_quotes("hello", false));
    assert!(needs_quotes("hello,world", false));
    assert!(needs_quotes("key:value", false));
    assert!(needs_quotes("", false));
    assert!(needs_quotes("true", false));
    assert!(needs_quotes("123", false));
    assert!(needs_quotes("NaN", false));
    assert!(needs_quotes(" padded", false));
    assert!(needs_quotes("!tag", false));

    // keys are never read as scalars
    assert!(!needs_quotes("123", true));
    assert!(!needs_quotes("true", true));
}
