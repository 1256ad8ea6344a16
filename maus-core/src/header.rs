//! The primary (always-plaintext) header of a `.maus` stream (§3 `StreamHeader`, §6).
//!
//! Grounded on the teacher's `Header`/`HeaderVersion` split in `header.rs`: a small fixed
//! preamble (magic, version, algorithm ids) followed by a variable-length section - there it's a
//! salt/nonce/keyslot list, here it's a generic [`OptionList`] carrying the same kind of
//! version-dependent, forward-compatible fields.

use std::io::{Read, Write};

use anyhow::{Context, Result};

use crate::error::{self, invalid_format};
use crate::options::{OptionList, OptionValue};
use crate::primitives::{
    read_u16, write_u16, CompressionId, EncryptionId, FormatVersion, HashId, STREAM_MAGIC,
};

/// Well-known primary-option-list keys. Unrecognized keys are preserved for round-trip but not
/// otherwise interpreted (§4.1.3 step 2).
pub mod keys {
    pub const SALT: &str = "salt";
    pub const IV: &str = "iv";
    pub const PBKDF2_ITER: &str = "iter";
    pub const WRAPPED_KEY: &str = "wrapped_key";
    pub const FILENAME: &str = "filename";
    pub const CREATED_TIME: &str = "ctime";
    pub const MODIFIED_TIME: &str = "mtime";
    pub const COMMENT: &str = "comment";
    pub const ENCRYPTED_OPTIONS_MASK: &str = "enc_opts";
}

/// The fixed-layout preamble plus the primary option list (§3, §6).
#[derive(Debug, Clone)]
pub struct StreamHeader {
    pub version: FormatVersion,
    pub compression: CompressionId,
    pub encryption: EncryptionId,
    pub hash_fn: HashId,
    pub options: OptionList,
}

impl StreamHeader {
    #[must_use]
    pub fn new(
        version: FormatVersion,
        compression: CompressionId,
        encryption: EncryptionId,
        hash_fn: HashId,
    ) -> Self {
        StreamHeader {
            version,
            compression,
            encryption,
            hash_fn,
            options: OptionList::new(),
        }
    }

    /// Serializes the complete primary header: magic, version, algorithm ids, option list.
    ///
    /// This is exactly the byte range the spec calls "primary-header-bytes" when computing the
    /// HMAC (§4.1.2 step 5) - callers must serialize the header once and reuse those bytes rather
    /// than re-deriving them, so the HMAC covers precisely what was emitted.
    pub fn serialize(&self, writer: &mut impl Write) -> Result<()> {
        writer
            .write_all(&STREAM_MAGIC)
            .context("Unable to write stream magic")?;
        write_u16(writer, self.version.wire())?;
        write_u16(writer, self.compression.wire())?;
        write_u16(writer, self.encryption.wire())?;
        write_u16(writer, self.hash_fn.wire())?;
        self.options.serialize(writer)?;
        Ok(())
    }

    /// Parses magic, version and algorithm ids, then the primary option list.
    ///
    /// A recognized-but-unsupported compression/encryption/hash id surfaces as
    /// [`error::Error::UnsupportedFeature`], not a generic format error (§7) - callers that only
    /// need to inspect or rewrite the header bytes (the `header` subcommands) can still do so
    /// without being able to execute the algorithm itself.
    pub fn deserialize(reader: &mut impl Read) -> error::Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .context("Unable to read stream magic")
            .map_err(invalid_format)?;
        if magic != STREAM_MAGIC {
            return Err(error::Error::InvalidFormat(format!(
                "Stream magic mismatch: expected {STREAM_MAGIC:?}, got {magic:?}"
            )));
        }

        let version_wire = read_u16(reader).map_err(invalid_format)?;
        let version = FormatVersion::from_wire(version_wire).ok_or_else(|| {
            error::Error::InvalidFormat(format!("Unrecognized stream version {version_wire}"))
        })?;

        let compression_wire = read_u16(reader).map_err(invalid_format)?;
        let compression = CompressionId::from_wire(compression_wire).ok_or_else(|| {
            error::Error::UnsupportedFeature(format!("Unrecognized compression id {compression_wire}"))
        })?;
        let encryption_wire = read_u16(reader).map_err(invalid_format)?;
        let encryption = EncryptionId::from_wire(encryption_wire).ok_or_else(|| {
            error::Error::UnsupportedFeature(format!("Unrecognized encryption id {encryption_wire}"))
        })?;
        let hash_wire = read_u16(reader).map_err(invalid_format)?;
        let hash_fn = HashId::from_wire(hash_wire).ok_or_else(|| {
            error::Error::UnsupportedFeature(format!("Unrecognized hash function id {hash_wire}"))
        })?;

        let options = OptionList::deserialize(reader).map_err(invalid_format)?;

        Ok(StreamHeader {
            version,
            compression,
            encryption,
            hash_fn,
            options,
        })
    }

    /// Re-serializes the header into its own byte range, for use as the HMAC/signature
    /// pre-image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize(&mut buf)?;
        Ok(buf)
    }

    pub fn set_salt(&mut self, salt: &[u8]) -> Result<()> {
        self.options
            .push(keys::SALT, 1, vec![OptionValue(salt.to_vec())])
    }

    #[must_use]
    pub fn salt(&self) -> Option<&[u8]> {
        self.options.get(keys::SALT).map(|e| e.values[0].0.as_slice())
    }

    pub fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        self.options
            .push(keys::IV, 1, vec![OptionValue(iv.to_vec())])
    }

    #[must_use]
    pub fn iv(&self) -> Option<&[u8]> {
        self.options.get(keys::IV).map(|e| e.values[0].0.as_slice())
    }

    pub fn set_pbkdf2_wire_iterations(&mut self, wire_value: u32) -> Result<()> {
        self.options.push(
            keys::PBKDF2_ITER,
            1,
            vec![OptionValue(wire_value.to_le_bytes().to_vec())],
        )
    }

    pub fn pbkdf2_wire_iterations(&self) -> Result<Option<u32>> {
        let Some(entry) = self.options.get(keys::PBKDF2_ITER) else {
            return Ok(None);
        };
        let bytes: [u8; 4] = entry.values[0]
            .0
            .as_slice()
            .try_into()
            .context("iter option value is not 4 bytes")?;
        Ok(Some(u32::from_le_bytes(bytes)))
    }

    pub fn set_wrapped_key(&mut self, wrapped: &[u8]) -> Result<()> {
        self.options
            .push(keys::WRAPPED_KEY, 1, vec![OptionValue(wrapped.to_vec())])
    }

    #[must_use]
    pub fn wrapped_key(&self) -> Option<&[u8]> {
        self.options
            .get(keys::WRAPPED_KEY)
            .map(|e| e.values[0].0.as_slice())
    }

    /// Sets the plaintext filename. Only valid when the filename is *not* part of the encrypted
    /// options mask (§4.1.3 edge case: filenames may be absent here if encrypted).
    pub fn set_filename(&mut self, filename: &str) -> Result<()> {
        self.options
            .push(keys::FILENAME, 1, vec![OptionValue::from_str(filename)])
    }

    pub fn filename(&self) -> Result<Option<String>> {
        match self.options.get(keys::FILENAME) {
            Some(entry) => Ok(Some(entry.values[0].as_str()?)),
            None => Ok(None),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_minimal_header() {
        let header = StreamHeader::new(
            FormatVersion::V93,
            CompressionId::Deflate,
            EncryptionId::None,
            HashId::Sha256,
        );
        let bytes = header.to_bytes().unwrap();
        let mut cur = Cursor::new(bytes);
        let decoded = StreamHeader::deserialize(&mut cur).unwrap();
        assert_eq!(decoded.version, FormatVersion::V93);
        assert_eq!(decoded.compression, CompressionId::Deflate);
        assert_eq!(decoded.encryption, EncryptionId::None);
        assert_eq!(decoded.hash_fn, HashId::Sha256);
    }

    #[test]
    fn roundtrip_with_crypto_options() {
        let mut header = StreamHeader::new(
            FormatVersion::V93,
            CompressionId::None,
            EncryptionId::Aes,
            HashId::Sha512,
        );
        header.set_salt(b"0123456789abcdef").unwrap();
        header.set_iv(b"fedcba9876543210").unwrap();
        header.set_pbkdf2_wire_iterations(10001).unwrap();
        header.set_filename("secret.txt").unwrap();

        let bytes = header.to_bytes().unwrap();
        let mut cur = Cursor::new(bytes);
        let decoded = StreamHeader::deserialize(&mut cur).unwrap();

        assert_eq!(decoded.salt().unwrap(), b"0123456789abcdef");
        assert_eq!(decoded.iv().unwrap(), b"fedcba9876543210");
        assert_eq!(decoded.pbkdf2_wire_iterations().unwrap(), Some(10001));
        assert_eq!(decoded.filename().unwrap().as_deref(), Some("secret.txt"));
    }

    #[test]
    fn filename_absent_when_not_set() {
        let header = StreamHeader::new(
            FormatVersion::V93,
            CompressionId::None,
            EncryptionId::None,
            HashId::Sha256,
        );
        assert_eq!(header.filename().unwrap(), None);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = StreamHeader::new(
            FormatVersion::V93,
            CompressionId::None,
            EncryptionId::None,
            HashId::Sha256,
        )
        .to_bytes()
        .unwrap();
        bytes[0] = b'X';
        let mut cur = Cursor::new(bytes);
        assert!(StreamHeader::deserialize(&mut cur).is_err());
    }

    #[test]
    fn rejects_unrecognized_version() {
        let mut bytes = STREAM_MAGIC.to_vec();
        bytes.extend_from_slice(&77u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // empty option list
        let mut cur = Cursor::new(bytes);
        assert!(StreamHeader::deserialize(&mut cur).is_err());
    }

    #[test]
    fn unrecognized_compression_id_is_unsupported_feature_not_invalid_format() {
        let mut bytes = STREAM_MAGIC.to_vec();
        bytes.extend_from_slice(&FormatVersion::V93.wire().to_le_bytes());
        bytes.extend_from_slice(&99u16.to_le_bytes()); // out-of-range compression id
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // empty option list
        let mut cur = Cursor::new(bytes);
        match StreamHeader::deserialize(&mut cur) {
            Err(error::Error::UnsupportedFeature(_)) => {}
            other => panic!("expected UnsupportedFeature, got {other:?}"),
        }
    }

}
