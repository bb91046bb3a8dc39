//! Framed documents on a shared, appendable buffer.
//!
//! A [`Wire`] owns one [`ByteCursor`] and delimits discrete documents inside
//! it. Each document starts with a 4-byte little-endian header:
//!
//! | bits   | meaning                                   |
//! |--------|-------------------------------------------|
//! | 0..30  | body length in bytes                      |
//! | 30     | metadata document                         |
//! | 31     | not complete (a writer still holds it)    |
//!
//! Opening a document, for reading or writing, takes the wire's lock. A
//! second writer waits up to [`WireOptions::lock_timeout`] and then fails
//! with [`Error::UnrecoverableTimeout`]; opening a second document on the
//! thread that already holds one fails with [`Error::ReentrantDocument`].
//!
//! A write scope that fails is rolled back: the write position returns to
//! where the header was reserved and no trace of the document remains.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{DocumentWriter, Wire, WireOptions};
//!
//! let wire = Wire::new(WireOptions::binary());
//! wire.write_message("price", &479.4).unwrap();
//!
//! let mut doc = wire.reading_document().unwrap().unwrap();
//! assert_eq!(doc.read("price").unwrap().float64().unwrap(), 479.4);
//! assert!(wire.reading_document().unwrap().is_none());
//! ```

use crate::codec;
use crate::{
    ByteCursor, DocumentIn, DocumentOut, Error, FieldMap, ReadDocument, Result, TypeRegistry,
    ValueOut, ValueOutExt, WireOptions, WireType, HEADER_SIZE,
};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// Header bit set while a document is being written.
pub const NOT_COMPLETE: u32 = 1 << 31;

/// Header bit marking a metadata document.
pub const META_DATA: u32 = 1 << 30;

/// Mask of the body length in a header; also the largest body allowed.
pub const LENGTH_MASK: u32 = META_DATA - 1;

/// Anything documents can be written to.
pub trait DocumentWriter {
    fn wire_type(&self) -> WireType;

    /// Writes one document whose content is produced by `f`.
    ///
    /// The document is rolled back when `f` fails.
    fn write_document<F>(&self, meta: bool, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn ValueOut) -> Result<()>;

    /// Writes an already encoded body as one document.
    fn write_bytes(&self, body: &[u8]) -> Result<()>;

    /// Writes a single `event: value` document.
    fn write_message<T>(&self, event: &str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.write_document(false, |out| {
            out.event(event)?;
            out.marshallable(value)
        })
    }

    /// Writes a document holding one bare text value.
    fn write_text(&self, text: &str) -> Result<()> {
        self.write_document(false, |out| out.text(text))
    }

    /// Writes each entry of `map` as an event of one document.
    fn write_map(&self, map: &FieldMap) -> Result<()> {
        self.write_document(false, |out| {
            for (name, value) in map {
                out.event(name)?;
                out.write_value(value)?;
            }
            Ok(())
        })
    }
}

/// Anything documents can be read from.
pub trait DocumentReader {
    /// Takes the next document, or `None` when none is available.
    fn read_document(&self) -> Result<Option<ReadDocument>>;
}

/// A buffer of framed documents shared between threads.
pub struct Wire {
    options: WireOptions,
    buffer: Mutex<ByteCursor>,
    owner: Mutex<Option<ThreadId>>,
    registry: Arc<TypeRegistry>,
}

impl Wire {
    #[must_use]
    pub fn new(options: WireOptions) -> Self {
        Self::with_registry(options, Arc::new(TypeRegistry::new()))
    }

    /// Creates a wire that resolves explicit types through `registry`.
    #[must_use]
    pub fn with_registry(options: WireOptions, registry: Arc<TypeRegistry>) -> Self {
        Wire {
            options,
            buffer: Mutex::new(ByteCursor::new()),
            owner: Mutex::new(None),
            registry,
        }
    }

    /// Creates a wire over bytes framed elsewhere, ready to be read.
    #[must_use]
    pub fn from_bytes(options: WireOptions, bytes: &[u8]) -> Self {
        let wire = Self::new(options);
        *wire.buffer.lock() = ByteCursor::from_slice(bytes);
        wire
    }

    #[must_use]
    pub fn options(&self) -> &WireOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Copies out everything written so far, headers included.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let cursor = self.acquire()?;
        let bytes = cursor.as_slice().to_vec();
        self.release();
        Ok(bytes)
    }

    pub fn read_position(&self) -> Result<usize> {
        let cursor = self.acquire()?;
        let position = cursor.read_position();
        self.release();
        Ok(position)
    }

    pub fn write_position(&self) -> Result<usize> {
        let cursor = self.acquire()?;
        let position = cursor.write_position();
        self.release();
        Ok(position)
    }

    /// Drops every document, read or not.
    pub fn clear(&self) -> Result<()> {
        let mut cursor = self.acquire()?;
        cursor.clear();
        self.release();
        Ok(())
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ByteCursor>> {
        let me = thread::current().id();
        if *self.owner.lock() == Some(me) {
            return Err(Error::ReentrantDocument);
        }
        let waited = self.options.lock_timeout;
        let guard = self.buffer.try_lock_for(waited).ok_or_else(|| {
            warn!("Document lock not acquired within {:?}", waited);
            Error::UnrecoverableTimeout { waited }
        })?;
        *self.owner.lock() = Some(me);
        Ok(guard)
    }

    fn release(&self) {
        *self.owner.lock() = None;
    }

    /// Opens a document for writing.
    ///
    /// The returned handle holds the wire's lock until it is closed or
    /// dropped. Dropping it seals the document, unless the thread is
    /// panicking or [`WriteDocument::rollback_on_close`] was called, in which
    /// case it is discarded.
    ///
    /// # Errors
    ///
    /// [`Error::ReentrantDocument`] or [`Error::UnrecoverableTimeout`].
    pub fn writing_document(&self, meta: bool) -> Result<WriteDocument<'_>> {
        let mut cursor = self.acquire()?;
        let header_pos = cursor.write_position();
        cursor.write_u32_le(NOT_COMPLETE);
        Ok(WriteDocument {
            wire: self,
            out: codec::document_out(&self.options, cursor),
            header_pos,
            meta,
            rollback: false,
            closed: false,
        })
    }

    /// Takes the next complete document.
    ///
    /// The read position moves past the document's declared length before
    /// the body is decoded, so a body that fails to decode is still consumed.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompleteDocument`] when the header or body is cut short
    ///   or still being written; nothing is consumed
    /// - any decoding error of the body
    pub fn reading_document(&self) -> Result<Option<ReadDocument>> {
        let mut cursor = self.acquire()?;
        let read = self.read_next(&mut cursor);
        self.release();
        read
    }

    fn read_next(&self, cursor: &mut ByteCursor) -> Result<Option<ReadDocument>> {
        let start = cursor.read_position();
        let available = cursor.read_remaining();
        if available == 0 {
            return Ok(None);
        }
        let header = match cursor.peek_u32_le(start) {
            Some(header) if available >= HEADER_SIZE => header,
            _ => return Err(Error::incomplete(start, HEADER_SIZE, available)),
        };
        let needed = HEADER_SIZE + (header & LENGTH_MASK) as usize;
        if header & NOT_COMPLETE != 0 || available < needed {
            return Err(Error::incomplete(start, needed, available));
        }
        let end = start + needed;
        cursor.set_read_position(end);

        let body = &cursor.as_slice()[start + HEADER_SIZE..end];
        let (events, wire_type) = codec::decode(self.options.wire_type, &self.options, body)
            .map_err(|e| {
                debug!(offset = start, "Skipped undecodable document: {}", e);
                e
            })?;
        let lenient = wire_type == WireType::Json && self.options.lenient_json_numbers;
        let input = DocumentIn::new(events, wire_type).with_lenient_numbers(lenient);
        Ok(Some(ReadDocument::new(
            header & META_DATA != 0,
            start..end,
            input,
        )))
    }
}

impl DocumentWriter for Wire {
    fn wire_type(&self) -> WireType {
        self.options.wire_type
    }

    fn write_document<F>(&self, meta: bool, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn ValueOut) -> Result<()>,
    {
        let mut doc = self.writing_document(meta)?;
        match f(doc.out()) {
            Ok(()) => doc.close(),
            Err(e) => {
                doc.rollback_on_close();
                doc.close()?;
                Err(e)
            }
        }
    }

    fn write_bytes(&self, body: &[u8]) -> Result<()> {
        let mut doc = self.writing_document(false)?;
        doc.out.cursor().write_slice(body);
        doc.close()
    }
}

impl DocumentReader for Wire {
    fn read_document(&self) -> Result<Option<ReadDocument>> {
        self.reading_document()
    }
}

impl std::fmt::Debug for Wire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wire")
            .field("options", &self.options)
            .field("registry", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// An open write document holding the wire's lock.
pub struct WriteDocument<'a> {
    wire: &'a Wire,
    out: Box<dyn DocumentOut + 'a>,
    header_pos: usize,
    meta: bool,
    rollback: bool,
    closed: bool,
}

impl<'a> WriteDocument<'a> {
    /// The writer for the document's content.
    pub fn out(&mut self) -> &mut dyn ValueOut {
        self.out.value_out()
    }

    #[must_use]
    pub fn is_meta_data(&self) -> bool {
        self.meta
    }

    /// Discards the document when it is closed.
    pub fn rollback_on_close(&mut self) {
        self.rollback = true;
    }

    /// Seals (or discards) the document and releases the lock.
    ///
    /// # Errors
    ///
    /// When the content is unbalanced or the body is too large; the document
    /// is rolled back in that case.
    pub fn close(mut self) -> Result<()> {
        self.complete()
    }

    fn complete(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        let result = if self.rollback || thread::panicking() {
            self.discard();
            Ok(())
        } else {
            self.seal().map_err(|e| {
                self.discard();
                e
            })
        };
        // the buffer guard inside `out` is dropped after this
        self.wire.release();
        result
    }

    fn seal(&mut self) -> Result<()> {
        self.out.finish()?;
        let filler = self.out.filler();
        let cursor = self.out.cursor();
        for _ in 0..self.wire.options.padding.padding_for(cursor.write_position()) {
            cursor.write_byte(filler);
        }
        let len = cursor.write_position() - self.header_pos - HEADER_SIZE;
        if len > LENGTH_MASK as usize {
            return Err(Error::custom(format!(
                "document body of {} bytes exceeds the {} byte limit",
                len, LENGTH_MASK
            )));
        }
        let header = len as u32 | if self.meta { META_DATA } else { 0 };
        cursor.write_u32_le_at(self.header_pos, header);
        Ok(())
    }

    fn discard(&mut self) {
        let cursor = self.out.cursor();
        debug!(
            offset = self.header_pos,
            bytes = cursor.write_position() - self.header_pos,
            "Rolled back document"
        );
        cursor.set_write_position(self.header_pos);
    }
}

impl Drop for WriteDocument<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            warn!("Document dropped without sealing: {}", e);
        }
    }
}
