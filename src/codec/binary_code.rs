//! Tag codes of the binary wire.
//!
//! Every value on the binary wire starts with one tag byte. Bytes below
//! `0x80` are small non-negative integers written as themselves; the high
//! half of the byte space holds the codes below. Two ranges carry a length
//! in their low five bits: short field names and short strings.

use crate::{Error, Result};

pub const NESTED_OBJECT: u8 = 0x82;
pub const SEQUENCE: u8 = 0x83;
pub const U8_ARRAY: u8 = 0x8A;
/// Followed by a u32 LE count of further padding bytes.
pub const PADDING32: u8 = 0x8E;
pub const PADDING: u8 = 0x8F;

pub const FLOAT32: u8 = 0x90;
pub const FLOAT64: u8 = 0x91;

pub const UINT8: u8 = 0xA1;
pub const UINT16: u8 = 0xA2;
pub const UINT32: u8 = 0xA3;
pub const INT8: u8 = 0xA4;
pub const INT16: u8 = 0xA5;
pub const INT32: u8 = 0xA6;
pub const INT64: u8 = 0xA7;
pub const UINT64: u8 = 0xA8;

pub const FALSE: u8 = 0xB1;
pub const TRUE: u8 = 0xB2;
pub const TYPE_PREFIX: u8 = 0xB6;
pub const FIELD_NAME_ANY: u8 = 0xB7;
pub const STRING_ANY: u8 = 0xB8;
pub const FIELD_NUMBER: u8 = 0xBA;
pub const NULL: u8 = 0xBB;

/// `FIELD_NAME0 + len` for names shorter than 32 bytes.
pub const FIELD_NAME0: u8 = 0xC0;
pub const FIELD_NAME31: u8 = 0xDF;
/// `STRING_0 + len` for strings shorter than 32 bytes.
pub const STRING_0: u8 = 0xE0;
pub const STRING_31: u8 = 0xFF;

/// Largest integer written as a bare byte.
pub const SMALL_INT_MAX: u8 = 0x7F;

/// Longest name or string that fits a short code.
pub const SHORT_LEN_MAX: usize = 31;

/// Every named code, for diagnostics and the uniqueness check.
pub const ALL: &[(&str, u8)] = &[
    ("NESTED_OBJECT", NESTED_OBJECT),
    ("SEQUENCE", SEQUENCE),
    ("U8_ARRAY", U8_ARRAY),
    ("PADDING32", PADDING32),
    ("PADDING", PADDING),
    ("FLOAT32", FLOAT32),
    ("FLOAT64", FLOAT64),
    ("UINT8", UINT8),
    ("UINT16", UINT16),
    ("UINT32", UINT32),
    ("INT8", INT8),
    ("INT16", INT16),
    ("INT32", INT32),
    ("INT64", INT64),
    ("UINT64", UINT64),
    ("FALSE", FALSE),
    ("TRUE", TRUE),
    ("TYPE_PREFIX", TYPE_PREFIX),
    ("FIELD_NAME_ANY", FIELD_NAME_ANY),
    ("STRING_ANY", STRING_ANY),
    ("FIELD_NUMBER", FIELD_NUMBER),
    ("NULL", NULL),
];

const fn all_unique(codes: &[(&str, u8)]) -> bool {
    let mut i = 0;
    while i < codes.len() {
        let code = codes[i].1;
        // the ranged codes own 0xC0..=0xFF, small ints own 0x00..=0x7F
        if code <= SMALL_INT_MAX || code >= FIELD_NAME0 {
            return false;
        }
        let mut j = i + 1;
        while j < codes.len() {
            if codes[j].1 == code {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(all_unique(ALL), "binary tag codes must be unique");

/// Checks a code table at runtime, naming the first collision.
///
/// # Errors
///
/// [`Error::DuplicateTag`] with the colliding code.
pub fn check_unique(codes: &[(&str, u8)]) -> Result<()> {
    let mut seen = [false; 256];
    for &(_, code) in codes {
        if seen[code as usize] {
            return Err(Error::DuplicateTag(code));
        }
        seen[code as usize] = true;
    }
    Ok(())
}

/// Name of a code, for error messages.
#[must_use]
pub fn name_of(code: u8) -> &'static str {
    match code {
        0..=SMALL_INT_MAX => "small int",
        FIELD_NAME0..=FIELD_NAME31 => "FIELD_NAME",
        STRING_0..=STRING_31 => "STRING",
        _ => ALL
            .iter()
            .find(|(_, c)| *c == code)
            .map_or("unknown", |&(name, _)| name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        assert!(check_unique(ALL).is_ok());
        assert!(all_unique(ALL));
    }

    #[test]
    fn test_collision_is_reported() {
        let table = [("A", 0x90), ("B", 0x91), ("C", 0x90)];
        assert!(matches!(check_unique(&table), Err(Error::DuplicateTag(0x90))));
        assert!(!all_unique(&table));
    }

    #[test]
    fn test_names() {
        assert_eq!(name_of(NULL), "NULL");
        assert_eq!(name_of(STRING_0 + 3), "STRING");
        assert_eq!(name_of(5), "small int");
        assert_eq!(name_of(0x80), "unknown");
    }
}
