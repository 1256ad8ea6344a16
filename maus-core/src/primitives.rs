//! This module contains the little-endian wire primitives used throughout `maus-core`.
//!
//! It has no notion of streams, headers or crypto - it only knows how to read and write
//! fixed-width integers, length-prefixed byte strings, and strict UTF-8, plus a constant-time
//! byte compare used by the integrity-checking code in [`crate::stream`].

use std::io::{Read, Write};

use anyhow::{Context, Result};

/// The chunk size used by [`crate::payload::BufferedPayload`], and the block size that the
/// streaming compression/encryption layers read and write at a time.
pub const CHUNK_SIZE: usize = 65_536; // 64 KiB

/// AES block size (and therefore IV length), in bytes.
pub const AES_BLOCK_LEN: usize = 16;

/// The constant added to the user-visible PBKDF2 cycle count to produce the wire value.
///
/// `wire_iterations = user_visible_cycles + PBKDF2_CYCLE_OFFSET`. This offset must never change -
/// doing so breaks cross-version decode (see spec §9).
pub const PBKDF2_CYCLE_OFFSET: u32 = 9001;

/// Minimum total PBKDF2 iterations enforced when writing (§6).
pub const PBKDF2_MIN_ITERATIONS: u32 = PBKDF2_CYCLE_OFFSET;

/// 4-byte magic identifying a `.maus` single-entry stream.
pub const STREAM_MAGIC: [u8; 4] = *b"maus";

/// 4-byte magic identifying a `.mauz` archive.
pub const ARCHIVE_MAGIC: [u8; 4] = *b"mauz";

/// The two stream/archive versions this implementation recognizes, as stored on the wire
/// (uint16-LE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    V92,
    V93,
}

impl FormatVersion {
    #[must_use]
    pub fn wire(self) -> u16 {
        match self {
            FormatVersion::V92 => 92,
            FormatVersion::V93 => 93,
        }
    }

    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            92 => Some(FormatVersion::V92),
            93 => Some(FormatVersion::V93),
            _ => None,
        }
    }

    /// Maximum UTF-8 byte length of a filename for this version (§6).
    #[must_use]
    pub fn max_filename_len(self) -> usize {
        match self {
            FormatVersion::V92 => 254,
            FormatVersion::V93 => 255,
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.wire())
    }
}

/// Compression transform identifiers, as stored on the wire (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionId {
    None,
    Deflate,
    Lzma,
}

impl CompressionId {
    #[must_use]
    pub fn wire(self) -> u16 {
        match self {
            CompressionId::None => 0,
            CompressionId::Deflate => 1,
            CompressionId::Lzma => 2,
        }
    }

    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(CompressionId::None),
            1 => Some(CompressionId::Deflate),
            2 => Some(CompressionId::Lzma),
            _ => None,
        }
    }
}

/// Encryption algorithm identifiers, as stored on the wire (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionId {
    None,
    Aes,
}

impl EncryptionId {
    #[must_use]
    pub fn wire(self) -> u16 {
        match self {
            EncryptionId::None => 0,
            EncryptionId::Aes => 1,
        }
    }

    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(EncryptionId::None),
            1 => Some(EncryptionId::Aes),
            _ => None,
        }
    }
}

/// Hash function identifiers, as stored on the wire (§6).
///
/// The id table is part of compatibility - unrecognized-but-in-range ids must be preserved
/// verbatim by any tooling that rewrites a header without re-hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashId {
    Sha256,
    Sha512,
    Sha3_256,
    Sha3_512,
}

impl HashId {
    #[must_use]
    pub fn wire(self) -> u16 {
        match self {
            HashId::Sha256 => 0,
            HashId::Sha512 => 1,
            HashId::Sha3_256 => 2,
            HashId::Sha3_512 => 3,
        }
    }

    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(HashId::Sha256),
            1 => Some(HashId::Sha512),
            2 => Some(HashId::Sha3_256),
            3 => Some(HashId::Sha3_512),
            _ => None,
        }
    }

    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            HashId::Sha256 | HashId::Sha3_256 => 32,
            HashId::Sha512 | HashId::Sha3_512 => 64,
        }
    }
}

/// Archive manifest record tags (§6), preserved exactly as specified.
pub const MANIFEST_SIG_ALL: [u8; 4] = [0x03, 0x53, 0x49, 0x47];
pub const MANIFEST_SIG_CUR: [u8; 4] = [0x03, 0x73, 0x69, 0x67];

/// Reads a little-endian `u16`.
pub fn read_u16(reader: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf).context("Unable to read u16")?;
    Ok(u16::from_le_bytes(buf))
}

/// Writes a little-endian `u16`.
pub fn write_u16(writer: &mut impl Write, value: u16) -> Result<()> {
    writer
        .write_all(&value.to_le_bytes())
        .context("Unable to write u16")
}

/// Reads a little-endian `u32`.
pub fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).context("Unable to read u32")?;
    Ok(u32::from_le_bytes(buf))
}

/// Writes a little-endian `u32`.
pub fn write_u32(writer: &mut impl Write, value: u32) -> Result<()> {
    writer
        .write_all(&value.to_le_bytes())
        .context("Unable to write u32")
}

/// Reads a little-endian `u64`.
pub fn read_u64(reader: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).context("Unable to read u64")?;
    Ok(u64::from_le_bytes(buf))
}

/// Writes a little-endian `u64`.
pub fn write_u64(writer: &mut impl Write, value: u64) -> Result<()> {
    writer
        .write_all(&value.to_le_bytes())
        .context("Unable to write u64")
}

/// Reads a little-endian `i64`.
pub fn read_i64(reader: &mut impl Read) -> Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).context("Unable to read i64")?;
    Ok(i64::from_le_bytes(buf))
}

/// Writes a little-endian `i64`.
pub fn write_i64(writer: &mut impl Write, value: i64) -> Result<()> {
    writer
        .write_all(&value.to_le_bytes())
        .context("Unable to write i64")
}

/// Decodes a uint16-LE length field, applying the format's one dialect convention: a stored `0`
/// means a length of `65536`, not zero (§4.3, §7).
#[must_use]
pub fn decode_len16(raw: u16) -> usize {
    if raw == 0 {
        65_536
    } else {
        raw as usize
    }
}

/// Encodes a byte-string length into the wire's uint16-LE length field, applying the zero-means-
/// 65536 convention in reverse.
///
/// # Errors
/// Returns an error if `len` is `0` (there is no way to encode a genuinely empty field under this
/// convention) or greater than `65536`.
pub fn encode_len16(len: usize) -> Result<u16> {
    match len {
        0 => Err(anyhow::anyhow!(
            "Zero-length fields cannot be represented under the maus length-field convention"
        )),
        65_536 => Ok(0),
        1..=65_535 => Ok(len as u16),
        _ => Err(anyhow::anyhow!(
            "Field length {len} exceeds the 65536-byte maximum"
        )),
    }
}

/// Reads a length-prefixed (uint16-LE, zero-means-65536) byte string.
pub fn read_len16_bytes(reader: &mut impl Read) -> Result<Vec<u8>> {
    let len = decode_len16(read_u16(reader)?);
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .context("Unable to read length-prefixed bytes")?;
    Ok(buf)
}

/// Writes a length-prefixed (uint16-LE, zero-means-65536) byte string.
pub fn write_len16_bytes(writer: &mut impl Write, bytes: &[u8]) -> Result<()> {
    write_u16(writer, encode_len16(bytes.len())?)?;
    writer
        .write_all(bytes)
        .context("Unable to write length-prefixed bytes")
}

/// Strictly decodes a byte slice as UTF-8, rejecting anything that isn't valid.
pub fn decode_utf8_strict(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).context("Field is not valid UTF-8")
}

/// Constant-time byte comparison, used for integrity/HMAC verification (§8 "Constant-time
/// compare"). Runtime is independent of the position of the first differing byte.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_u16_u32_u64() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 0xABCD).unwrap();
        write_u32(&mut buf, 0xDEAD_BEEF).unwrap();
        write_u64(&mut buf, 0x0123_4567_89AB_CDEF).unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_u16(&mut cur).unwrap(), 0xABCD);
        assert_eq!(read_u32(&mut cur).unwrap(), 0xDEAD_BEEF);
        assert_eq!(read_u64(&mut cur).unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn zero_length_field_means_65536() {
        assert_eq!(decode_len16(0), 65_536);
        assert_eq!(decode_len16(1), 1);
        assert_eq!(encode_len16(65_536).unwrap(), 0);
        assert_eq!(encode_len16(1).unwrap(), 1);
        assert!(encode_len16(0).is_err());
        assert!(encode_len16(65_537).is_err());
    }

    #[test]
    fn length_prefixed_bytes_roundtrip() {
        let mut buf = Vec::new();
        write_len16_bytes(&mut buf, b"hello").unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_len16_bytes(&mut cur).unwrap(), b"hello");
    }

    #[test]
    fn constant_time_compare() {
        assert!(ct_eq(b"abcdef", b"abcdef"));
        assert!(!ct_eq(b"abcdef", b"abcdeg"));
        assert!(!ct_eq(b"abc", b"abcd"));
    }

    #[test]
    fn format_versions() {
        assert_eq!(FormatVersion::from_wire(92), Some(FormatVersion::V92));
        assert_eq!(FormatVersion::from_wire(93), Some(FormatVersion::V93));
        assert_eq!(FormatVersion::from_wire(1), None);
        assert_eq!(FormatVersion::V92.max_filename_len(), 254);
        assert_eq!(FormatVersion::V93.max_filename_len(), 255);
    }
}
