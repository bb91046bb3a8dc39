//! Fields of a wire object, in the order they were written.
//!
//! Every codec renders an object's fields in [`FieldMap`] order, and every
//! reader inserts them in the order it meets them, so translating a document
//! from one wire to another never reorders its fields. A repeated field name
//! keeps its first position and takes the last value.
//!
//! ```rust
//! use serde_wire::{from_json, FieldMap, Value};
//!
//! let quote: Value = from_json(r#"{"symbol":"III","bid":479.4,"ask":479.5}"#).unwrap();
//! let fields: &FieldMap = quote.as_object().unwrap();
//! let names: Vec<_> = fields.keys().map(String::as_str).collect();
//! assert_eq!(names, ["symbol", "bid", "ask"]);
//! ```

use crate::Value;
use indexmap::IndexMap;

/// Named fields of a [`Value::Object`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap(IndexMap<String, Value>);

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        FieldMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        FieldMap(IndexMap::with_capacity(capacity))
    }

    /// Sets a field. A name already present keeps its position; its previous
    /// value is returned.
    pub fn insert(&mut self, name: String, value: Value) -> Option<Value> {
        self.0.insert(name, value)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The field at `index` in write order.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<(&String, &Value)> {
        self.0.get_index(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn into_values(self) -> indexmap::map::IntoValues<String, Value> {
        self.0.into_values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        FieldMap(IndexMap::from_iter(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_field_keeps_first_position() {
        let mut fields: FieldMap = [("bid", 1), ("ask", 2), ("last", 3)]
            .into_iter()
            .map(|(name, n)| (name.to_string(), Value::from(n)))
            .collect();

        assert_eq!(fields.insert("bid".to_string(), Value::from(9)), Some(Value::from(1)));
        let names: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(names, ["bid", "ask", "last"]);
        assert_eq!(fields.get_index(0), Some((&"bid".to_string(), &Value::from(9))));
    }

    #[test]
    fn test_translation_keeps_field_order() {
        let json = br#"{"z":1,"a":2,"m":{"y":3,"b":4}}"#;
        let text = crate::translate(json, &crate::WireOptions::json(), &crate::WireOptions::text())
            .unwrap();
        let back: Value = crate::from_slice_with(&text, &crate::WireOptions::text()).unwrap();
        let outer: Vec<_> = back.as_object().unwrap().keys().cloned().collect();
        assert_eq!(outer, ["z", "a", "m"]);
        let inner: Vec<_> = back
            .get("m")
            .and_then(Value::as_object)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        assert_eq!(inner, ["y", "b"]);
    }
}
