//! The typed option list used for both the primary (plaintext) and secondary (encrypted) header
//! sections of a `.maus` stream (§4.3).
//!
//! Wire layout, all integers little-endian:
//!
//! ```text
//! count: uint16
//! repeated count times:
//!   key-len: uint16      (0 means 65536)
//!   key-bytes: UTF-8
//!   version: uint16      (MUST be != 0)
//!   value-count: uint16
//!   repeated value-count times:
//!     val-len: uint16    (0 means 65536)
//!     val-bytes
//! ```

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};

use crate::primitives::{
    decode_utf8_strict, read_len16_bytes, read_u16, write_len16_bytes, write_u16,
};

/// Maximum number of entries an `OptionList` may hold (§4.3).
pub const MAX_ENTRIES: usize = 65_535;

/// A single value in an option entry. Interpretation as UTF-8/uint16/int64 is a decoding
/// convenience - the wire type is always an opaque byte string (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValue(pub Vec<u8>);

impl OptionValue {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        OptionValue(s.as_bytes().to_vec())
    }

    #[must_use]
    pub fn from_u16(v: u16) -> Self {
        OptionValue(v.to_le_bytes().to_vec())
    }

    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        OptionValue(v.to_le_bytes().to_vec())
    }

    pub fn as_str(&self) -> Result<String> {
        decode_utf8_strict(&self.0)
    }

    pub fn as_u16(&self) -> Result<u16> {
        let bytes: [u8; 2] = self
            .0
            .as_slice()
            .try_into()
            .context("Value is not 2 bytes wide, cannot interpret as uint16-LE")?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn as_i64(&self) -> Result<i64> {
        let bytes: [u8; 8] = self
            .0
            .as_slice()
            .try_into()
            .context("Value is not 8 bytes wide, cannot interpret as int64-LE")?;
        Ok(i64::from_le_bytes(bytes))
    }
}

/// One `(key, version, values)` record of an [`OptionList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub key: String,
    pub version: u16,
    pub values: Vec<OptionValue>,
}

/// An ordered sequence of typed key/value options (§3, §4.3).
///
/// Keys are not required to be unique; callers that want "the" value for a key should take the
/// first match, mirroring how unknown-but-recognized keys are preserved for round-trip while
/// entirely unknown keys are simply ignored (§4.1.3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    entries: Vec<OptionEntry>,
}

impl OptionList {
    #[must_use]
    pub fn new() -> Self {
        OptionList::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter()
    }

    /// Appends an entry. Fails with `CapacityExceeded` semantics (via the returned `Err`) once
    /// the list already holds [`MAX_ENTRIES`] entries.
    pub fn push(&mut self, key: impl Into<String>, version: u16, values: Vec<OptionValue>) -> Result<()> {
        if self.entries.len() >= MAX_ENTRIES {
            bail!("Option list already holds the maximum of {MAX_ENTRIES} entries");
        }
        let key = key.into();
        if key.is_empty() {
            bail!("Option key must be non-empty");
        }
        if version == 0 {
            bail!("Option version must be non-zero");
        }
        self.entries.push(OptionEntry {
            key,
            version,
            values,
        });
        Ok(())
    }

    /// Returns the first entry with a matching key, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn serialize(&self, writer: &mut impl Write) -> Result<()> {
        if self.entries.len() > MAX_ENTRIES {
            bail!("Option list has {} entries, exceeding the {MAX_ENTRIES} maximum", self.entries.len());
        }
        write_u16(writer, self.entries.len() as u16)?;
        for entry in &self.entries {
            write_len16_bytes(writer, entry.key.as_bytes())?;
            write_u16(writer, entry.version)?;
            write_u16(writer, entry.values.len() as u16)?;
            for value in &entry.values {
                write_len16_bytes(writer, &value.0)?;
            }
        }
        Ok(())
    }

    pub fn deserialize(reader: &mut impl Read) -> Result<Self> {
        let count = read_u16(reader)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key_bytes = read_len16_bytes(reader)?;
            let key = decode_utf8_strict(&key_bytes).context("Option key is not valid UTF-8")?;
            let version = read_u16(reader)?;
            if version == 0 {
                bail!("Option entry for key {key:?} has version 0, which is not permitted");
            }
            let value_count = read_u16(reader)?;
            let mut values = Vec::with_capacity(value_count as usize);
            for _ in 0..value_count {
                values.push(OptionValue(read_len16_bytes(reader)?));
            }
            entries.push(OptionEntry {
                key,
                version,
                values,
            });
        }
        Ok(OptionList { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_empty() {
        let list = OptionList::new();
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cur = Cursor::new(buf);
        let decoded = OptionList::deserialize(&mut cur).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn roundtrip_mixed_values() {
        let mut list = OptionList::new();
        list.push(
            "filename",
            1,
            vec![OptionValue::from_str("hello.txt")],
        )
        .unwrap();
        list.push("mtime", 1, vec![OptionValue::from_i64(1_700_000_000)])
            .unwrap();
        list.push("iter", 1, vec![OptionValue::from_u16(1000)])
            .unwrap();

        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cur = Cursor::new(buf);
        let decoded = OptionList::deserialize(&mut cur).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(
            decoded.get("filename").unwrap().values[0].as_str().unwrap(),
            "hello.txt"
        );
        assert_eq!(
            decoded.get("mtime").unwrap().values[0].as_i64().unwrap(),
            1_700_000_000
        );
        assert_eq!(decoded.get("iter").unwrap().values[0].as_u16().unwrap(), 1000);
    }

    #[test]
    fn rejects_zero_version() {
        let mut list = OptionList::new();
        assert!(list.push("k", 0, vec![]).is_err());
    }

    #[test]
    fn rejects_empty_key() {
        let mut list = OptionList::new();
        assert!(list.push("", 1, vec![]).is_err());
    }

    #[test]
    fn unknown_version_zero_on_wire_is_rejected() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 1).unwrap(); // count = 1
        write_len16_bytes(&mut buf, b"k").unwrap();
        write_u16(&mut buf, 0).unwrap(); // version = 0, invalid
        write_u16(&mut buf, 0).unwrap(); // value-count
        let mut cur = Cursor::new(buf);
        assert!(OptionList::deserialize(&mut cur).is_err());
    }
}
