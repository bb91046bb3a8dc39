//! Error types for wire encoding, decoding, framing and dispatch.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is the single [`Error`] enum below.
//!
//! ## Error Categories
//!
//! - **Identifier errors**: malformed compact identifier text ([`Error::Format`])
//! - **Codec errors**: unparsable bytes with the offending byte and offset
//!   ([`Error::MalformedInput`])
//! - **Shape errors**: an accessor that does not match the value on the wire
//!   ([`Error::TypeMismatch`], [`Error::ExhaustedSequence`], [`Error::MissingField`])
//! - **Resolution errors**: type names unknown to the registry ([`Error::TypeResolution`])
//! - **Framing errors**: reentrant opens, truncated documents and lock timeouts
//! - **Binding errors**: duplicate tags, method ids or type names, detected
//!   when a table is built rather than when it is first used
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{Error, BASE85, LongConverter};
//!
//! let result = BASE85.parse("not allowed: space");
//! assert!(matches!(result, Err(Error::Format(_))));
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Represents all possible errors raised by the engine.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed compact identifier text
    #[error("Format error: {0}")]
    Format(String),

    /// Bytes that no codec rule accepts
    #[error("Malformed input at offset {offset}: unexpected {}: {msg}", describe_byte(.byte))]
    MalformedInput {
        byte: Option<u8>,
        offset: usize,
        msg: String,
    },

    /// Accessor does not match the shape of the value on the wire
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Type name unknown to the type registry
    #[error("Unable to resolve type '{0}'")]
    TypeResolution(String),

    /// A document was opened while this thread already holds one open
    #[error("A document is already open on this thread")]
    ReentrantDocument,

    /// A document header promises more bytes than the buffer holds
    #[error("Incomplete document at offset {offset}: needed {needed} bytes, {available} available")]
    IncompleteDocument {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The document lock could not be acquired in time
    #[error("Unable to acquire the document lock within {waited:?}")]
    UnrecoverableTimeout { waited: Duration },

    /// More sequence items were requested than the sequence holds
    #[error("No more items in sequence")]
    ExhaustedSequence,

    /// A named field was requested but is not present
    #[error("Missing field '{0}'")]
    MissingField(String),

    /// Two binary tag constants share a value
    #[error("Duplicate binary tag 0x{0:02X}")]
    DuplicateTag(u8),

    /// Two methods of a dispatch contract share a name or id
    #[error("Duplicate method in contract: {0}")]
    DuplicateMethod(String),

    /// Two registry entries share a name
    #[error("Duplicate type name '{0}'")]
    DuplicateType(String),

    /// A method that the dispatch contract does not declare
    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),

    /// Generic message
    #[error("{0}")]
    Message(String),
}

fn describe_byte(byte: &Option<u8>) -> String {
    match *byte {
        Some(b) if b.is_ascii_graphic() => format!("'{}'", b as char),
        Some(b) => format!("byte 0x{:02X}", b),
        None => "end of input".to_string(),
    }
}

impl Error {
    /// Creates a format error for malformed identifier text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::Error;
    ///
    /// let err = Error::format("too many digits");
    /// assert!(err.to_string().contains("too many digits"));
    /// ```
    pub fn format<T: fmt::Display>(msg: T) -> Self {
        Error::Format(msg.to_string())
    }

    /// Creates a malformed input error naming the offending byte and its offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::Error;
    ///
    /// let err = Error::malformed(Some(b'x'), 7, "expected a value");
    /// assert!(err.to_string().contains("offset 7"));
    /// assert!(err.to_string().contains("'x'"));
    /// ```
    pub fn malformed(byte: Option<u8>, offset: usize, msg: &str) -> Self {
        Error::MalformedInput {
            byte,
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates a type mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::Error;
    ///
    /// let err = Error::type_mismatch("int64", "object");
    /// assert!(err.to_string().contains("expected int64"));
    /// ```
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates a type resolution error for a name the registry does not know.
    pub fn type_resolution(name: &str) -> Self {
        Error::TypeResolution(name.to_string())
    }

    /// Creates an incomplete document error.
    pub fn incomplete(offset: usize, needed: usize, available: usize) -> Self {
        Error::IncompleteDocument {
            offset,
            needed,
            available,
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(name: &str) -> Self {
        Error::MissingField(name.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns `true` for errors raised while acquiring or nesting documents.
    ///
    /// These are always surfaced to the caller; the engine never retries them.
    #[must_use]
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Error::ReentrantDocument
                | Error::IncompleteDocument { .. }
                | Error::UnrecoverableTimeout { .. }
        )
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        Error::MissingField(field.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
