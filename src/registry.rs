//! Explicit name-to-type registry for typed values.
//!
//! Wires carry type names (`!Point { .. }`, `{"@Point": ..}`); the
//! [`TypeRegistry`] maps those names to Rust types and back. It is populated
//! once at startup and then shared read-only, usually behind an `Arc`.
//!
//! ## Examples
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_wire::{wire_value, TypeRegistry, Value};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Point>("Point").unwrap();
//!
//! assert_eq!(registry.name_of::<Point>(), Some("Point"));
//! assert!(registry.resolve("Missing").is_err());
//!
//! let any = registry.instantiate("Point", wire_value!({ "x": 1, "y": 2 })).unwrap();
//! assert_eq!(any.downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
//! ```

use crate::{from_value, Error, Result, Value};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

type Factory = Box<dyn Fn(Value) -> Result<Box<dyn Any + Send>> + Send + Sync>;

/// One registered type.
pub struct RegisteredType {
    name: String,
    type_id: TypeId,
    rust_name: &'static str,
    factory: Factory,
}

impl RegisteredType {
    /// The name written on the wire.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The Rust path of the registered type, for diagnostics.
    #[must_use]
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Returns `true` if this entry is the Rust type `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for RegisteredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredType")
            .field("name", &self.name)
            .field("rust_name", &self.rust_name)
            .finish()
    }
}

/// Maps wire type names to Rust types.
#[derive(Default, Debug)]
pub struct TypeRegistry {
    by_name: IndexMap<String, RegisteredType>,
    by_type: HashMap<TypeId, String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name`.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateType`] if the name or the type is already registered.
    pub fn register<T>(&mut self, name: &str) -> Result<&mut Self>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let type_id = TypeId::of::<T>();
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicateType(name.to_string()));
        }
        if let Some(existing) = self.by_type.get(&type_id) {
            return Err(Error::DuplicateType(format!(
                "{} (already registered as '{}')",
                std::any::type_name::<T>(),
                existing
            )));
        }

        let factory: Factory = Box::new(|value: Value| {
            let instance: T = from_value(value)?;
            Ok(Box::new(instance) as Box<dyn Any + Send>)
        });
        self.by_name.insert(
            name.to_string(),
            RegisteredType {
                name: name.to_string(),
                type_id,
                rust_name: std::any::type_name::<T>(),
                factory,
            },
        );
        self.by_type.insert(type_id, name.to_string());
        Ok(self)
    }

    /// Looks up a wire type name.
    ///
    /// # Errors
    ///
    /// [`Error::TypeResolution`] for names that were never registered.
    pub fn resolve(&self, name: &str) -> Result<&RegisteredType> {
        self.by_name
            .get(name)
            .ok_or_else(|| Error::type_resolution(name))
    }

    /// The wire name `T` is registered under.
    #[must_use]
    pub fn name_of<T: 'static>(&self) -> Option<&str> {
        self.by_type.get(&TypeId::of::<T>()).map(String::as_str)
    }

    /// Builds a fresh instance of the type registered as `name` from `value`.
    pub fn instantiate(&self, name: &str, value: Value) -> Result<Box<dyn Any + Send>> {
        let entry = self.resolve(name)?;
        (entry.factory)(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredType> {
        self.by_name.values()
    }
}
