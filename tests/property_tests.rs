//! Property-based tests for the guarantees every wire makes: a value written
//! to one wire reads back unchanged, and radix converters are bijective.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_wire::{
    from_slice_with, to_bytes_with, translate, FieldMap, LongConverter, RadixConverter, Value,
    WireOptions, BASE16, BASE32, BASE40, BASE64, BASE85,
};
use std::collections::HashMap;

fn all_wires() -> [WireOptions; 4] {
    [
        WireOptions::text(),
        WireOptions::yaml(),
        WireOptions::binary(),
        WireOptions::json(),
    ]
}

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    all_wires().iter().all(|options| {
        match to_bytes_with(value, options) {
            Ok(bytes) => match from_slice_with::<T>(&bytes, options) {
                Ok(back) => *value == back,
                Err(e) => {
                    eprintln!("{:?}: read failed: {}", options.wire_type, e);
                    eprintln!("written was: {:?}", String::from_utf8_lossy(&bytes));
                    false
                }
            },
            Err(e) => {
                eprintln!("{:?}: write failed: {}", options.wire_type, e);
                false
            }
        }
    })
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Trade {
    symbol: String,
    price: f64,
    quantity: i64,
    venue: Option<String>,
    fills: Vec<u32>,
}

/// Wires that keep explicit types; JSON drops them unless asked not to.
fn typed_wires() -> [WireOptions; 4] {
    [
        WireOptions::text(),
        WireOptions::yaml(),
        WireOptions::binary(),
        WireOptions::json().with_use_types(true),
    ]
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        // quarters are exact in f32, so the binary wire may narrow them
        (-4000i32..4000).prop_map(|n| Value::from(f64::from(n) / 4.0)),
        "[a-zA-Z0-9 _.-]{0,10}".prop_map(Value::Text),
    ]
}

fn fields(inner: impl Strategy<Value = Value>) -> impl Strategy<Value = FieldMap> {
    prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
        .prop_map(|fields| fields.into_iter().collect())
}

fn value_tree() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Sequence),
            fields(inner.clone()).prop_map(Value::Object),
            ("[A-Z][a-z]{0,5}", inner).prop_map(|(name, value)| Value::typed(name, value)),
        ]
    })
}

fn converters() -> [RadixConverter; 5] {
    [BASE85, BASE64, BASE40, BASE32, BASE16]
}

proptest! {
    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_finite_f64(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
        prop_assert!(roundtrip(&x));
    }

    #[test]
    fn prop_bool(b in any::<bool>()) {
        prop_assert!(roundtrip(&b));
    }

    #[test]
    fn prop_text(s in "\\PC*") {
        prop_assert!(roundtrip(&s));
    }

    #[test]
    fn prop_text_with_escapes(s in "[a-z\"'\\\\:,#{}\\[\\] \t\n-]{0,16}") {
        prop_assert!(roundtrip(&s));
    }

    #[test]
    fn prop_vec_i64(v in prop::collection::vec(any::<i64>(), 0..20)) {
        prop_assert!(roundtrip(&v));
    }

    #[test]
    fn prop_option_i32(opt in proptest::option::of(any::<i32>())) {
        prop_assert!(roundtrip(&opt));
    }

    #[test]
    fn prop_struct(
        symbol in "[A-Z]{1,5}",
        price in -1.0e9f64..1.0e9,
        quantity in any::<i64>(),
        venue in proptest::option::of("[A-Za-z ]{0,12}"),
        fills in prop::collection::vec(any::<u32>(), 0..8),
    ) {
        let trade = Trade { symbol, price, quantity, venue, fills };
        prop_assert!(roundtrip(&trade));
    }

    #[test]
    fn prop_value_tree_on_every_wire(tree in fields(value_tree())) {
        let tree = Value::Object(tree);
        for options in typed_wires() {
            let bytes = to_bytes_with(&tree, &options).unwrap();
            let back: Value = from_slice_with(&bytes, &options).unwrap();
            prop_assert_eq!(
                &back,
                &tree,
                "{:?} wrote {:?}",
                options.wire_type,
                String::from_utf8_lossy(&bytes)
            );
        }
    }

    #[test]
    fn prop_map(map in prop::collection::hash_map("[a-z]{1,6}", any::<i64>(), 0..6)) {
        prop_assert!(roundtrip::<HashMap<String, i64>>(&map));
    }

    #[test]
    fn prop_translation_is_lossless(v in prop::collection::vec(any::<i32>(), 0..10), s in "\\PC{0,12}") {
        let source = to_bytes_with(&(v.clone(), s.clone()), &WireOptions::binary()).unwrap();
        for to in all_wires() {
            let translated = translate(&source, &WireOptions::binary(), &to).unwrap();
            let back: (Vec<i32>, String) = from_slice_with(&translated, &to).unwrap();
            prop_assert_eq!(&back.0, &v);
            prop_assert_eq!(&back.1, &s);
        }
    }

    #[test]
    fn prop_converter_round_trip(n in any::<i64>()) {
        for converter in converters() {
            let text = converter.as_string(n);
            prop_assert!(text.len() <= converter.max_width());
            prop_assert_eq!(converter.parse(&text).unwrap(), n);
        }
    }

    #[test]
    fn prop_converter_leading_zeros(n in any::<i64>()) {
        for converter in converters() {
            let zero = converter.alphabet().chars().next().unwrap();
            let text = converter.as_string(n);
            let padded: String = std::iter::repeat(zero)
                .take(converter.max_width() - text.len())
                .chain(text.chars())
                .collect();
            prop_assert_eq!(converter.parse(&padded).unwrap(), n);
        }
    }
}
