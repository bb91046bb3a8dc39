//! Compact textual identifiers for 64-bit integers.
//!
//! A [`LongConverter`] maps an `i64` to a short string over a fixed alphabet
//! and back. These strings are used as low-overhead typed identifiers: a
//! symbol such as `"abcd"` is stored and compared as a single integer but
//! reads as text on every textual wire.
//!
//! ## Radix converters
//!
//! [`RadixConverter`] treats text as a big-endian numeral in the alphabet's
//! radix. Leading characters that map to digit zero are accepted on input
//! (up to the converter's maximum width) and stripped on output, so zero
//! encodes to the empty string. Values are handled as unsigned 64-bit bit
//! patterns, which means negative numbers round-trip too.
//!
//! | Converter  | Radix | Max width |
//! |------------|-------|-----------|
//! | [`BASE85`] | 85    | 10        |
//! | [`BASE64`] | 64    | 11        |
//! | [`BASE40`] | 40    | 13        |
//! | [`BASE32`] | 32    | 13        |
//! | [`BASE16`] | 16    | 16        |
//!
//! ## Examples
//!
//! ```rust
//! use serde_wire::{LongConverter, BASE85};
//!
//! let id = BASE85.parse("abcd").unwrap();
//! assert_eq!(BASE85.as_string(id), "abcd");
//!
//! assert_eq!(BASE85.parse("0000000000").unwrap(), 0);
//! assert!(BASE85.parse("00000000000").is_err());
//! assert_eq!(BASE85.as_string(0), "");
//! ```

use crate::{ByteCursor, Error, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Converts between `i64` values and compact text.
pub trait LongConverter: Send + Sync {
    /// Maximum number of characters [`as_string`](Self::as_string) can emit.
    fn max_width(&self) -> usize;

    /// Parses text into a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] for characters outside the alphabet, text
    /// longer than [`max_width`](Self::max_width) or values that overflow.
    fn parse(&self, text: &str) -> Result<i64>;

    /// Appends the textual form of `value` to `out`.
    fn append(&self, out: &mut String, value: i64);

    /// Parses `len` characters of `text` starting at byte `offset`.
    ///
    /// Behaves exactly like [`parse`](Self::parse) on the equivalent substring.
    fn parse_range(&self, text: &str, offset: usize, len: usize) -> Result<i64> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| Error::format("range overflows"))?;
        let slice = text.get(offset..end).ok_or_else(|| {
            Error::format(format!(
                "range {}..{} is outside text of length {}",
                offset,
                end,
                text.len()
            ))
        })?;
        self.parse(slice)
    }

    /// Returns the textual form of `value`.
    fn as_string(&self, value: i64) -> String {
        let mut out = String::with_capacity(self.max_width());
        self.append(&mut out, value);
        out
    }

    /// Appends the textual form of `value` at the cursor's write position.
    fn append_to(&self, cursor: &mut ByteCursor, value: i64) {
        cursor.append(&self.as_string(value));
    }
}

const INVALID: u8 = 0xFF;

/// A fixed-alphabet, fixed-radix converter.
///
/// The alphabet's position defines each character's digit value.
#[derive(Debug, Clone)]
pub struct RadixConverter {
    alphabet: &'static [u8],
    lookup: [u8; 256],
    max_width: usize,
}

impl RadixConverter {
    /// Builds a converter for `alphabet`, usable in `const` items.
    ///
    /// # Panics
    ///
    /// Panics (at compile time for constants) if the alphabet is not ASCII,
    /// is shorter than 2 characters, or repeats a character. Use
    /// [`try_new`](Self::try_new) for alphabets chosen at run time.
    #[must_use]
    pub const fn new(alphabet: &'static str) -> Self {
        match Self::build(alphabet) {
            Some(converter) => converter,
            None => panic!("invalid converter alphabet"),
        }
    }

    /// Builds a converter, rejecting invalid alphabets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wire::RadixConverter;
    ///
    /// assert!(RadixConverter::try_new("0123456789").is_ok());
    /// assert!(RadixConverter::try_new("01234567890").is_err());
    /// ```
    pub fn try_new(alphabet: &'static str) -> Result<Self> {
        Self::build(alphabet).ok_or_else(|| {
            Error::format(format!(
                "alphabet {:?} must be at least 2 distinct ASCII characters",
                alphabet
            ))
        })
    }

    const fn build(alphabet: &'static str) -> Option<Self> {
        let bytes = alphabet.as_bytes();
        if bytes.len() < 2 || bytes.len() > 255 {
            return None;
        }
        let mut lookup = [INVALID; 256];
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            if c >= 0x80 || lookup[c as usize] != INVALID {
                return None;
            }
            lookup[c as usize] = i as u8;
            i += 1;
        }

        // digits needed for u64::MAX
        let radix = bytes.len() as u64;
        let mut max_width = 0;
        let mut remaining = u64::MAX;
        while remaining > 0 {
            remaining /= radix;
            max_width += 1;
        }

        Some(RadixConverter {
            alphabet: bytes,
            lookup,
            max_width,
        })
    }

    /// Number of distinct digits.
    #[must_use]
    pub const fn radix(&self) -> usize {
        self.alphabet.len()
    }

    /// The alphabet, ordered by digit value.
    #[must_use]
    pub fn alphabet(&self) -> &'static str {
        // only ASCII alphabets are accepted
        std::str::from_utf8(self.alphabet).unwrap_or_default()
    }
}

impl LongConverter for RadixConverter {
    fn max_width(&self) -> usize {
        self.max_width
    }

    fn parse(&self, text: &str) -> Result<i64> {
        if text.len() > self.max_width {
            return Err(Error::format(format!(
                "{:?} is longer than {} characters",
                text, self.max_width
            )));
        }
        let radix = self.radix() as u64;
        let mut acc: u64 = 0;
        for (index, byte) in text.bytes().enumerate() {
            let digit = self.lookup[byte as usize];
            if digit == INVALID {
                return Err(Error::format(format!(
                    "unexpected character {:?} at {} in {:?}",
                    byte as char, index, text
                )));
            }
            acc = acc
                .checked_mul(radix)
                .and_then(|v| v.checked_add(digit as u64))
                .ok_or_else(|| Error::format(format!("{:?} overflows 64 bits", text)))?;
        }
        Ok(acc as i64)
    }

    fn append(&self, out: &mut String, value: i64) {
        let radix = self.radix() as u64;
        let mut remaining = value as u64;
        let mut digits = [0u8; 64];
        let mut count = 0;
        while remaining != 0 {
            digits[count] = self.alphabet[(remaining % radix) as usize];
            remaining /= radix;
            count += 1;
        }
        out.extend(digits[..count].iter().rev().map(|&b| b as char));
    }
}

/// Radix 85: digits, punctuation and both letter cases. No space, comma or quote.
pub const BASE85: RadixConverter = RadixConverter::new(
    "0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz#$%&()*+-.",
);

/// Radix 64 over URL-safe characters.
pub const BASE64: RadixConverter =
    RadixConverter::new(".ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_");

/// Radix 40: upper case letters, digits and a little punctuation.
pub const BASE40: RadixConverter =
    RadixConverter::new(".ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789:-+");

/// Radix 32 without easily confused letters.
pub const BASE32: RadixConverter = RadixConverter::new("234567ABCDEFGHIJKLMNOPQRSTUVWXYZ");

/// Radix 16, upper case.
pub const BASE16: RadixConverter = RadixConverter::new("0123456789ABCDEF");

/// Renders nanoseconds since the Unix epoch as an ISO-8601 UTC timestamp.
///
/// # Examples
///
/// ```rust
/// use serde_wire::{LongConverter, NanoTimestampConverter};
///
/// let ts = NanoTimestampConverter;
/// assert_eq!(ts.as_string(1_500_000_000), "1970-01-01T00:00:01.500000000Z");
/// assert_eq!(ts.parse("1970-01-01T00:00:01.5Z").unwrap(), 1_500_000_000);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NanoTimestampConverter;

impl LongConverter for NanoTimestampConverter {
    fn max_width(&self) -> usize {
        // 2262-04-11T23:47:16.854775807Z
        30
    }

    fn parse(&self, text: &str) -> Result<i64> {
        if text.is_empty() {
            return Ok(0);
        }
        let parsed = DateTime::parse_from_rfc3339(text)
            .map_err(|e| Error::format(format!("{:?} is not a timestamp: {}", text, e)))?;
        parsed
            .with_timezone(&Utc)
            .timestamp_nanos_opt()
            .ok_or_else(|| Error::format(format!("{:?} is outside the nanosecond range", text)))
    }

    fn append(&self, out: &mut String, value: i64) {
        let timestamp = Utc.timestamp_nanos(value);
        out.push_str(&timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUND_TRIP: &str = ",a,ab,abc,abcd,ab.de,123=56,1234567,12345678,zzzzzzzzz,+ko2&)z.0";

    #[test]
    fn test_published_widths() {
        assert_eq!(BASE85.max_width(), 10);
        assert_eq!(BASE64.max_width(), 11);
        assert_eq!(BASE40.max_width(), 13);
        assert_eq!(BASE32.max_width(), 13);
        assert_eq!(BASE16.max_width(), 16);
        assert_eq!(BASE85.radix(), 85);
    }

    #[test]
    fn test_leading_zeros() {
        for width in 1..=10 {
            assert_eq!(BASE85.parse(&"0".repeat(width)).unwrap(), 0);
        }
        assert!(matches!(
            BASE85.parse("00000000000"),
            Err(Error::Format(_))
        ));
        assert_eq!(BASE85.as_string(0), "");
        assert_eq!(BASE85.parse("").unwrap(), 0);
    }

    #[test]
    fn test_canonical_strings_round_trip() {
        for s in ROUND_TRIP.split(',') {
            let v = BASE85.parse(s).unwrap();
            let mut out = String::new();
            BASE85.append(&mut out, v);
            assert_eq!(out, s);
        }
    }

    #[test]
    fn test_parse_range_matches_substrings() {
        let text = format!("{},", ROUND_TRIP);
        let mut start = 0;
        let mut compared = 0;
        for (i, c) in text.char_indices() {
            if c == ',' {
                let expected = BASE85.parse(&text[start..i]).unwrap();
                assert_eq!(BASE85.parse_range(&text, start, i - start).unwrap(), expected);
                start = i + 1;
                compared += 1;
            }
        }
        assert_eq!(compared, 11);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(BASE85.parse("serde_wire::converter::tests").is_err());
        assert!(BASE85.parse_range("ABCD", 3, 3).is_err());
        assert!(BASE85.parse("a b").is_err());
        // ten digits past u64::MAX
        assert!(BASE85.parse("..........").is_err());
    }

    #[test]
    fn test_extremes_round_trip() {
        for converter in [&BASE85, &BASE64, &BASE40, &BASE32, &BASE16] {
            for v in [i64::MIN, -1, 1, i64::MAX] {
                let s = converter.as_string(v);
                assert!(s.len() <= converter.max_width());
                assert_eq!(converter.parse(&s).unwrap(), v);
            }
        }
    }

    #[test]
    fn test_append_after_existing_content() {
        let v = BASE85.parse("world").unwrap();
        let mut cursor = ByteCursor::new();
        cursor.append("hello");
        BASE85.append_to(&mut cursor, v);
        assert_eq!(cursor.as_slice(), b"helloworld");
    }

    #[test]
    fn test_duplicate_alphabet_rejected() {
        assert!(RadixConverter::try_new("abca").is_err());
        assert!(RadixConverter::try_new("a").is_err());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = NanoTimestampConverter;
        let v = 1_700_000_000_123_456_789;
        let s = ts.as_string(v);
        assert!(s.len() <= ts.max_width());
        assert_eq!(ts.parse(&s).unwrap(), v);
        assert!(ts.parse("yesterday").is_err());
    }
}
