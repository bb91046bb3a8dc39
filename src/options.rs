//! Configuration options for wires and documents.
//!
//! This module provides types to choose and tune a wire:
//!
//! - [`WireOptions`]: Main configuration struct, built with chained setters
//! - [`WireType`]: Which concrete encoding renders the value model
//! - [`Padding`]: Alignment policy applied between framed documents
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{Padding, WireOptions, WireType};
//! use std::time::Duration;
//!
//! let options = WireOptions::binary()
//!     .with_padding(Padding::Smart)
//!     .with_lock_timeout(Duration::from_millis(250));
//! assert_eq!(options.wire_type, WireType::Binary);
//!
//! let json = WireOptions::json().with_use_types(true);
//! assert!(json.use_types);
//! ```

use std::time::Duration;

/// Concrete encoding used by a wire.
///
/// # Examples
///
/// ```rust
/// use serde_wire::WireType;
///
/// assert!(WireType::Binary.is_binary());
/// assert!(!WireType::Json.is_binary());
/// assert_eq!(WireType::Yaml.as_str(), "yaml");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum WireType {
    /// Structured text: `name: value` lines with `{ }` and `[ ]` blocks
    #[default]
    Text,
    /// YAML-like: block mappings by indentation, `- ` sequences
    Yaml,
    /// Compact tagged binary
    Binary,
    /// JSON, optionally with `{"@Type": value}` wrappers
    Json,
    /// Reads any of the above, detecting each document's encoding; writes text
    ReadAny,
}

impl WireType {
    /// Returns a short lowercase name for this wire type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            WireType::Text => "text",
            WireType::Yaml => "yaml",
            WireType::Binary => "binary",
            WireType::Json => "json",
            WireType::ReadAny => "read_any",
        }
    }

    /// Returns `true` when values are written as tagged binary.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, WireType::Binary)
    }

    /// Returns `true` when fields can be looked up by name in any order.
    #[must_use]
    pub const fn supports_random_fields(&self) -> bool {
        !matches!(self, WireType::Binary)
    }
}

/// Alignment applied after a document is closed so the next header lands well.
///
/// - **Never**: documents are packed back to back
/// - **Word**: every header starts on a 4-byte boundary
/// - **CacheLine**: every header starts on a 64-byte boundary
/// - **Smart**: pads only when the next header would straddle a cache line
///
/// # Examples
///
/// ```rust
/// use serde_wire::Padding;
///
/// assert_eq!(Padding::Never.padding_for(13), 0);
/// assert_eq!(Padding::Word.padding_for(13), 3);
/// assert_eq!(Padding::CacheLine.padding_for(13), 51);
/// assert_eq!(Padding::Smart.padding_for(13), 0);
/// assert_eq!(Padding::Smart.padding_for(62), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Padding {
    #[default]
    Never,
    Word,
    CacheLine,
    Smart,
}

/// Size of a cache line in bytes.
pub const CACHE_LINE_SIZE: usize = 64;

/// Size of the document header word in bytes.
pub const HEADER_SIZE: usize = 4;

impl Padding {
    /// Number of filler bytes needed so that a header written at `position`
    /// would satisfy this policy.
    #[must_use]
    pub const fn padding_for(&self, position: usize) -> usize {
        match self {
            Padding::Never => 0,
            Padding::Word => (HEADER_SIZE - position % HEADER_SIZE) % HEADER_SIZE,
            Padding::CacheLine => (CACHE_LINE_SIZE - position % CACHE_LINE_SIZE) % CACHE_LINE_SIZE,
            Padding::Smart => {
                let offset = position % CACHE_LINE_SIZE;
                if offset + HEADER_SIZE > CACHE_LINE_SIZE {
                    CACHE_LINE_SIZE - offset
                } else {
                    0
                }
            }
        }
    }
}

/// Configuration for a [`Wire`](crate::Wire) and the codecs it drives.
///
/// # Examples
///
/// ```rust
/// use serde_wire::{WireOptions, WireType};
///
/// // Default structured text
/// let options = WireOptions::new();
/// assert_eq!(options.wire_type, WireType::Text);
///
/// // YAML-like with 4-space indentation
/// let options = WireOptions::yaml().with_indent(4);
/// assert_eq!(options.indent, 4);
/// ```
#[derive(Clone, Debug)]
pub struct WireOptions {
    pub wire_type: WireType,
    pub padding: Padding,
    pub lock_timeout: Duration,
    pub use_types: bool,
    pub indent: usize,
    pub lenient_json_numbers: bool,
}

impl Default for WireOptions {
    fn default() -> Self {
        WireOptions {
            wire_type: WireType::default(),
            padding: Padding::default(),
            lock_timeout: Duration::from_secs(20),
            use_types: false,
            indent: 2,
            lenient_json_numbers: false,
        }
    }
}

impl WireOptions {
    /// Creates default options (structured text, no padding, 20s lock timeout).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::WireOptions;
    ///
    /// let options = WireOptions::new();
    /// assert_eq!(options.indent, 2);
    /// assert!(!options.use_types);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the structured text wire.
    #[must_use]
    pub fn text() -> Self {
        Self::default().with_wire_type(WireType::Text)
    }

    /// Options for the YAML-like wire.
    #[must_use]
    pub fn yaml() -> Self {
        Self::default().with_wire_type(WireType::Yaml)
    }

    /// Options for the binary wire.
    #[must_use]
    pub fn binary() -> Self {
        Self::default().with_wire_type(WireType::Binary)
    }

    /// Options for the JSON wire.
    #[must_use]
    pub fn json() -> Self {
        Self::default().with_wire_type(WireType::Json)
    }

    /// Sets the wire type.
    #[must_use]
    pub fn with_wire_type(mut self, wire_type: WireType) -> Self {
        self.wire_type = wire_type;
        self
    }

    /// Sets the padding policy applied between documents.
    #[must_use]
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Sets how long a document open waits for the buffer lock.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::WireOptions;
    /// use std::time::Duration;
    ///
    /// let options = WireOptions::new().with_lock_timeout(Duration::from_millis(10));
    /// assert_eq!(options.lock_timeout, Duration::from_millis(10));
    /// ```
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Enables `{"@Type": value}` wrappers on the JSON wire.
    ///
    /// Without it, type prefixes are dropped and JSON is plain and untyped.
    #[must_use]
    pub fn with_use_types(mut self, use_types: bool) -> Self {
        self.use_types = use_types;
        self
    }

    /// Sets the indentation size (number of spaces per level) for text wires.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// When enabled, reading a floating point value where a JSON object or
    /// array begins logs a warning and yields `0.0` instead of failing.
    #[must_use]
    pub fn with_lenient_json_numbers(mut self, lenient: bool) -> Self {
        self.lenient_json_numbers = lenient;
        self
    }
}
