//! Method-call dispatch over framed documents.
//!
//! A [`Contract`] names a set of single-argument methods, optionally with a
//! small integer id each. A [`MethodWriter`] turns `call(method, &arg)` into
//! one document holding one event; a [`MethodReader`] reads documents back
//! and invokes the handler bound to each event, in the order they were
//! written.
//!
//! On binary wires a method with an id is written as a numeric event, which
//! is smaller and cheaper to match than its name.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{ContractBuilder, MethodReaderBuilder, MethodWriter, Wire, WireOptions};
//! use std::sync::{Arc, Mutex};
//!
//! let contract = Arc::new(
//!     ContractBuilder::new("Quotes")
//!         .method_with_id("topOfBook", 116)
//!         .build()
//!         .unwrap(),
//! );
//! let wire = Wire::new(WireOptions::binary());
//! MethodWriter::new(Arc::clone(&contract), &wire)
//!     .call("topOfBook", &[479.4, 479.6])
//!     .unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let mut reader = MethodReaderBuilder::new(contract)
//!     .on("topOfBook", move |quote: Vec<f64>| sink.lock().unwrap().push(quote))
//!     .build()
//!     .unwrap();
//! assert!(reader.read_one(&wire).unwrap());
//! assert_eq!(*seen.lock().unwrap(), vec![vec![479.4, 479.6]]);
//! ```

use crate::{DocumentReader, DocumentWriter, Error, FieldKey, Result, ValueIn, ValueOutExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// One method of a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    name: String,
    id: Option<u32>,
}

impl Method {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.id
    }
}

/// Builder for a [`Contract`].
#[derive(Clone, Debug)]
pub struct ContractBuilder {
    name: String,
    methods: Vec<Method>,
}

impl ContractBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        ContractBuilder {
            name: name.to_string(),
            methods: Vec::new(),
        }
    }

    /// Declares a method identified by name only.
    #[must_use]
    pub fn method(mut self, name: &str) -> Self {
        self.methods.push(Method {
            name: name.to_string(),
            id: None,
        });
        self
    }

    /// Declares a method that binary wires identify by `id`.
    #[must_use]
    pub fn method_with_id(mut self, name: &str, id: u32) -> Self {
        self.methods.push(Method {
            name: name.to_string(),
            id: Some(id),
        });
        self
    }

    /// # Errors
    ///
    /// [`Error::DuplicateMethod`] when two methods share a name or an id.
    pub fn build(self) -> Result<Contract> {
        let mut by_name = HashMap::with_capacity(self.methods.len());
        let mut by_id = HashMap::new();
        for (index, method) in self.methods.iter().enumerate() {
            if by_name.insert(method.name.clone(), index).is_some() {
                return Err(Error::DuplicateMethod(format!(
                    "{}.{}",
                    self.name, method.name
                )));
            }
            if let Some(id) = method.id {
                if let Some(previous) = by_id.insert(id, index) {
                    return Err(Error::DuplicateMethod(format!(
                        "{}: id {} used by both {} and {}",
                        self.name, id, self.methods[previous].name, method.name
                    )));
                }
            }
        }
        Ok(Contract {
            name: self.name,
            methods: self.methods,
            by_name,
            by_id,
        })
    }
}

/// A validated set of named single-argument methods.
#[derive(Clone, Debug)]
pub struct Contract {
    name: String,
    methods: Vec<Method>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u32, usize>,
}

impl Contract {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.by_name.get(name).map(|&i| &self.methods[i])
    }

    #[must_use]
    pub fn method_by_id(&self, id: u32) -> Option<&Method> {
        self.by_id.get(&id).map(|&i| &self.methods[i])
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    fn index_of(&self, key: &FieldKey) -> Option<usize> {
        match key {
            FieldKey::Name(name) => self.by_name.get(name).copied(),
            FieldKey::Id(id) => self.by_id.get(id).copied(),
        }
    }
}

/// Writes method calls as documents.
pub struct MethodWriter<'w, W: DocumentWriter> {
    contract: Arc<Contract>,
    writer: &'w W,
}

impl<'w, W: DocumentWriter> MethodWriter<'w, W> {
    pub fn new(contract: Arc<Contract>, writer: &'w W) -> Self {
        MethodWriter { contract, writer }
    }

    #[must_use]
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Writes one document calling `method` with `arg`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownMethod`] when the contract does not declare `method`;
    /// nothing is written in that case.
    pub fn call<A>(&self, method: &str, arg: &A) -> Result<()>
    where
        A: ?Sized + Serialize,
    {
        let method = self
            .contract
            .method(method)
            .ok_or_else(|| Error::UnknownMethod(method.to_string()))?;
        self.writer.write_document(false, |out| {
            match method.id {
                Some(id) => out.event_id(&method.name, id)?,
                None => out.event(&method.name)?,
            }
            out.marshallable(arg)
        })
    }
}

type Handler = Box<dyn FnMut(ValueIn) -> Result<()>>;
type UnknownHandler = Box<dyn FnMut(Option<&FieldKey>, &ValueIn)>;

/// Binds handlers to the methods of a contract.
pub struct MethodReaderBuilder {
    contract: Arc<Contract>,
    handlers: Vec<(String, Handler)>,
    unknown: Option<UnknownHandler>,
}

impl MethodReaderBuilder {
    #[must_use]
    pub fn new(contract: Arc<Contract>) -> Self {
        MethodReaderBuilder {
            contract,
            handlers: Vec::new(),
            unknown: None,
        }
    }

    /// Binds `handler` to `method`; its argument is decoded as `A`.
    #[must_use]
    pub fn on<A, F>(mut self, method: &str, mut handler: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: FnMut(A) + 'static,
    {
        let handler: Handler = Box::new(move |arg: ValueIn| {
            handler(arg.marshallable::<A>()?);
            Ok(())
        });
        self.handlers.push((method.to_string(), handler));
        self
    }

    /// Called for every event no handler is bound to.
    #[must_use]
    pub fn on_unknown<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Option<&FieldKey>, &ValueIn) + 'static,
    {
        self.unknown = Some(Box::new(callback));
        self
    }

    /// # Errors
    ///
    /// - [`Error::UnknownMethod`] when a handler names a method the contract
    ///   does not declare
    /// - [`Error::DuplicateMethod`] when a method is bound twice
    pub fn build(self) -> Result<MethodReader> {
        let mut handlers: Vec<Option<Handler>> =
            std::iter::repeat_with(|| None).take(self.contract.len()).collect();
        for (name, handler) in self.handlers {
            let index = self
                .contract
                .by_name
                .get(&name)
                .copied()
                .ok_or_else(|| Error::UnknownMethod(name.clone()))?;
            if handlers[index].replace(handler).is_some() {
                return Err(Error::DuplicateMethod(format!("{} bound twice", name)));
            }
        }
        Ok(MethodReader {
            contract: self.contract,
            handlers,
            unknown: self.unknown,
        })
    }
}

/// Reads documents and dispatches their events to bound handlers.
pub struct MethodReader {
    contract: Arc<Contract>,
    handlers: Vec<Option<Handler>>,
    unknown: Option<UnknownHandler>,
}

impl MethodReader {
    #[must_use]
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Dispatches every event of the next non-metadata document.
    ///
    /// Metadata documents are skipped. Events nobody handles are reported
    /// and skipped. Returns `false` when no document was available.
    ///
    /// # Errors
    ///
    /// Framing and decoding errors from `reader`, and argument decoding
    /// errors; the document is consumed either way.
    pub fn read_one<R: DocumentReader + ?Sized>(&mut self, reader: &R) -> Result<bool> {
        loop {
            let Some(doc) = reader.read_document()? else {
                return Ok(false);
            };
            if doc.is_meta_data() {
                continue;
            }
            let mut input = doc.into_input();
            while let Some((key, arg)) = input.read_event() {
                self.dispatch(key.as_ref(), arg)?;
            }
            return Ok(true);
        }
    }

    /// Reads until no document is left; returns how many were dispatched.
    pub fn read_all<R: DocumentReader + ?Sized>(&mut self, reader: &R) -> Result<usize> {
        let mut count = 0;
        while self.read_one(reader)? {
            count += 1;
        }
        Ok(count)
    }

    fn dispatch(&mut self, key: Option<&FieldKey>, arg: ValueIn) -> Result<()> {
        let bound = key
            .and_then(|key| self.contract.index_of(key))
            .and_then(|index| self.handlers[index].as_mut());
        match bound {
            Some(handler) => handler(arg),
            None => {
                match key {
                    Some(key) => warn!("Unknown event '{}' for {}", key, self.contract.name),
                    None => warn!("Unnamed event for {}", self.contract.name),
                }
                if let Some(callback) = self.unknown.as_mut() {
                    callback(key, &arg);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Wire, WireOptions};
    use serde::Deserialize;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TopOfBook {
        symbol: String,
        bid_price: f64,
        ask_price: f64,
    }

    fn contract() -> Arc<Contract> {
        Arc::new(
            ContractBuilder::new("MarketData")
                .method_with_id("topOfBook", 116)
                .method("halt")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_duplicates_rejected_at_build() {
        let by_name = ContractBuilder::new("C").method("a").method("a").build();
        assert!(matches!(by_name, Err(Error::DuplicateMethod(_))));

        let by_id = ContractBuilder::new("C")
            .method_with_id("a", 7)
            .method_with_id("b", 7)
            .build();
        assert!(matches!(by_id, Err(Error::DuplicateMethod(msg)) if msg.contains("id 7")));

        let twice = MethodReaderBuilder::new(contract())
            .on("halt", |_: String| {})
            .on("halt", |_: String| {})
            .build();
        assert!(matches!(twice, Err(Error::DuplicateMethod(_))));

        let unknown = MethodReaderBuilder::new(contract()).on("resume", |_: String| {}).build();
        assert!(matches!(unknown, Err(Error::UnknownMethod(_))));
    }

    #[test]
    fn test_method_id_on_binary() {
        let wire = Wire::new(WireOptions::binary());
        let quote = TopOfBook {
            symbol: "III".to_string(),
            bid_price: 479.4,
            ask_price: 479.6,
        };
        MethodWriter::new(contract(), &wire).call("topOfBook", &quote).unwrap();

        let mut doc = wire.reading_document().unwrap().unwrap();
        let (key, arg) = doc.read_event().unwrap();
        assert_eq!(key, Some(FieldKey::Id(116)));
        assert_eq!(arg.marshallable::<TopOfBook>().unwrap(), quote);
        assert!(!doc.has_more());
    }

    #[test]
    fn test_method_name_on_text() {
        let wire = Wire::new(WireOptions::text());
        MethodWriter::new(contract(), &wire).call("halt", "lunch").unwrap();
        assert_eq!(&wire.bytes().unwrap()[4..], b"halt: lunch\n");
    }

    #[test]
    fn test_unknown_method_writes_nothing() {
        let wire = Wire::new(WireOptions::text());
        let result = MethodWriter::new(contract(), &wire).call("resume", &1);
        assert!(matches!(result, Err(Error::UnknownMethod(_))));
        assert_eq!(wire.write_position().unwrap(), 0);
    }

    #[test]
    fn test_dispatch_in_order_and_report_unknown() {
        for options in [WireOptions::binary(), WireOptions::yaml(), WireOptions::json()] {
            let wire = Wire::new(options);
            let writer = MethodWriter::new(contract(), &wire);
            writer.call("halt", "open").unwrap();
            wire.write_message("stray", &1).unwrap();
            wire.write_document(true, |out| {
                out.event("halt")?;
                out.text("meta")
            })
            .unwrap();
            writer.call("halt", "close").unwrap();

            let calls = Rc::new(RefCell::new(Vec::new()));
            let unknown = Rc::new(RefCell::new(Vec::new()));
            let (c, u) = (Rc::clone(&calls), Rc::clone(&unknown));
            let mut reader = MethodReaderBuilder::new(contract())
                .on("halt", move |reason: String| c.borrow_mut().push(reason))
                .on_unknown(move |key, _| u.borrow_mut().push(key.map(ToString::to_string)))
                .build()
                .unwrap();

            assert_eq!(reader.read_all(&wire).unwrap(), 3);
            assert_eq!(*calls.borrow(), vec!["open", "close"]);
            assert_eq!(*unknown.borrow(), vec![Some("stray".to_string())]);
            assert!(!reader.read_one(&wire).unwrap());
        }
    }
}
