//! `StreamCodec`: the bidirectional state machine that reads or writes one `.maus` stream (§4.1).
//!
//! Grounded on the shape of the teacher's `stream.rs` - a pair of mode-specific types
//! (`EncryptionStreams`/`DecryptionStreams` there, [`StreamWriter`]/[`StreamReader`] here) that
//! each drive [`crate::cipher`] and an external streaming transform over fixed-size chunks - but
//! built around CBC + a detached HMAC and the option-list header instead of an AEAD stream cipher.
//!
//! Wire layout of one stream, after the primary header (§3, §6):
//!
//! ```text
//! payload-len: uint64              (ciphertext length if encrypted, else compressed payload length)
//! payload: bytes
//! integrity: bytes                 (HMAC if encrypted, else the plaintext hash; length = hash_fn.output_len())
//! signature-count: uint16
//! repeated signature-count times:
//!   asymmetric-id: uint16
//!   key-id: len16 bytes            (empty if none)
//!   signature: len16 bytes
//! ```
//!
//! The encrypted pre-image (§4.1.2 step 4) is `random-prefix (16B) ‖ secondary-option-list ‖
//! compressed-len (uint64) ‖ compressed-payload ‖ plaintext-hash`, PKCS#7-padded and encrypted
//! under `(k, iv)`.

use std::io::{Cursor, Read};

use crate::cipher::{self, Ciphers, KeyBits};
use crate::compression::{CompressorSink, DecompressorSink};
use crate::error::{invalid_format, Error, Result};
use crate::header::{keys, StreamHeader};
use crate::key;
use crate::options::{OptionList, OptionValue};
use crate::primitives::{
    ct_eq, read_len16_bytes, read_u16, read_u64, write_len16_bytes, write_u16, write_u64,
    CompressionId, EncryptionId, FormatVersion, HashId, AES_BLOCK_LEN,
};
use crate::payload::BufferedPayload;
use crate::progress::{ProgressBus, ProgressEvent};
use crate::protected::Protected;
use crate::signature::{AsymmetricId, SigningKey, VerifyingKey};
use rsa::RsaPublicKey;

/// Symmetric-encryption parameters for a write-mode codec (§4.1.2 steps 4-5, §6).
pub struct EncryptionParams {
    pub key_bits: KeyBits,
    pub password: Option<Protected<Vec<u8>>>,
    pub raw_key: Option<Protected<Vec<u8>>>,
    /// User-visible PBKDF2 cycle count (wire value is this plus the 9001 offset).
    pub pbkdf2_user_cycles: u32,
    /// If set, the derived/raw key is additionally wrapped under this RSA public key (§6
    /// "wrapped-keys") and stored in the primary header.
    pub wrap_public_key: Option<RsaPublicKey>,
}

/// One asymmetric signature to produce over the entry's integrity value (§4.1.2 step 6).
pub struct SigningParams {
    pub key: SigningKey,
    pub key_id: Option<String>,
}

/// Configuration for a compress-mode [`StreamWriter`] (§3 `Entry`, §4.1.2).
pub struct WriteConfig {
    pub version: FormatVersion,
    pub compression: CompressionId,
    pub hash_fn: HashId,
    pub filename: Option<String>,
    /// Whether `filename` is placed in the secondary (encrypted) option list rather than the
    /// primary one. Only meaningful when `encryption` is set.
    pub encrypt_filename: bool,
    pub created_time: Option<i64>,
    pub modified_time: Option<i64>,
    pub comment: Option<String>,
    pub user_options: OptionList,
    pub encryption: Option<EncryptionParams>,
    pub signing: Vec<SigningParams>,
}

impl WriteConfig {
    #[must_use]
    pub fn new(version: FormatVersion, compression: CompressionId, hash_fn: HashId) -> Self {
        WriteConfig {
            version,
            compression,
            hash_fn,
            filename: None,
            encrypt_filename: false,
            created_time: None,
            modified_time: None,
            comment: None,
            user_options: OptionList::new(),
            encryption: None,
            signing: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Configured,
    Writing,
    Finalizing,
    Emitted,
    Closed,
    Failed,
}

/// A single-use, compress-mode `StreamCodec` (§4.1.1).
pub struct StreamWriter {
    state: WriteState,
    config: WriteConfig,
    payload: BufferedPayload,
    progress: ProgressBus,
}

fn populate_metadata(
    options: &mut OptionList,
    config: &WriteConfig,
    include_filename: bool,
) -> Result<()> {
    if include_filename {
        if let Some(name) = &config.filename {
            options
                .push(keys::FILENAME, 1, vec![OptionValue::from_str(name)])
                .map_err(invalid_format)?;
        }
    }
    if let Some(ct) = config.created_time {
        options
            .push(keys::CREATED_TIME, 1, vec![OptionValue::from_i64(ct)])
            .map_err(invalid_format)?;
    }
    if let Some(mt) = config.modified_time {
        options
            .push(keys::MODIFIED_TIME, 1, vec![OptionValue::from_i64(mt)])
            .map_err(invalid_format)?;
    }
    if let Some(comment) = &config.comment {
        options
            .push(keys::COMMENT, 1, vec![OptionValue::from_str(comment)])
            .map_err(invalid_format)?;
    }
    for entry in config.user_options.iter() {
        options
            .push(entry.key.clone(), entry.version, entry.values.clone())
            .map_err(invalid_format)?;
    }
    Ok(())
}

impl StreamWriter {
    #[must_use]
    pub fn new(config: WriteConfig) -> Self {
        let mut progress = ProgressBus::new();
        progress.emit(ProgressEvent::Configured);
        StreamWriter {
            state: WriteState::Configured,
            config,
            payload: BufferedPayload::new(),
            progress,
        }
    }

    pub fn progress_bus(&mut self) -> &mut ProgressBus {
        &mut self.progress
    }

    /// Pushes plaintext bytes into the write sink. Valid from `Configured` or `Writing`.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        if !matches!(self.state, WriteState::Configured | WriteState::Writing) {
            return Err(Error::InvalidState(
                "push() is only valid before the stream has been finalized",
            ));
        }
        self.state = WriteState::Writing;
        self.payload.append(bytes);
        self.progress.emit(ProgressEvent::Writing {
            bytes_so_far: self.payload.len(),
        });
        Ok(())
    }

    /// Closes the write sink and assembles the final framed stream (§4.1.2 steps 1-7).
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if !matches!(self.state, WriteState::Configured | WriteState::Writing) {
            return Err(Error::InvalidState(
                "finish() called on a stream that is already finalized or failed",
            ));
        }
        self.state = WriteState::Finalizing;
        self.progress.emit(ProgressEvent::Finalizing);

        self.payload.finish();
        self.payload.reset();
        let mut plaintext = Vec::with_capacity(self.payload.len() as usize);
        self.payload
            .read_to_end(&mut plaintext)
            .map_err(|e| Error::Io(e))?;

        let mut compressor = CompressorSink::new(self.config.compression);
        compressor.push(&plaintext).map_err(invalid_format)?;
        let compressed = compressor.finish().map_err(invalid_format)?;

        let plaintext_hash = cipher::hash(self.config.hash_fn, &plaintext);

        let encryption_id = if self.config.encryption.is_some() {
            EncryptionId::Aes
        } else {
            EncryptionId::None
        };
        if self.config.encrypt_filename && self.config.encryption.is_none() {
            return Err(Error::InvalidState(
                "encrypt_filename requires an encryption configuration",
            ));
        }

        let mut header =
            StreamHeader::new(self.config.version, self.config.compression, encryption_id, self.config.hash_fn);

        let (payload_bytes, integrity, sign_preimage);

        if let Some(enc) = self.config.encryption.take() {
            let salt = key::gen_random(enc.key_bits.key_len());
            let iv = key::gen_random(AES_BLOCK_LEN);
            let total_iterations = key::cycles_to_wire(enc.pbkdf2_user_cycles);

            let k = match (enc.raw_key, enc.password) {
                (Some(raw), _) => raw,
                (None, Some(password)) => {
                    key::derive_key(password, &salt, total_iterations, self.config.hash_fn, enc.key_bits.key_len())
                        .map_err(invalid_format)?
                }
                (None, None) => {
                    return Err(Error::InvalidState(
                        "encryption was configured without a password or raw key",
                    ))
                }
            };

            header.set_salt(&salt).map_err(invalid_format)?;
            header.set_iv(&iv).map_err(invalid_format)?;
            header
                .set_pbkdf2_wire_iterations(enc.pbkdf2_user_cycles)
                .map_err(invalid_format)?;

            if let Some(pubkey) = &enc.wrap_public_key {
                let wrapped = crate::signature::rsa_wrap_key(pubkey, k.expose())
                    .map_err(invalid_format)?;
                header.set_wrapped_key(&wrapped).map_err(invalid_format)?;
            }

            if !self.config.encrypt_filename {
                if let Some(name) = &self.config.filename {
                    header
                        .options
                        .push(keys::FILENAME, 1, vec![OptionValue::from_str(name)])
                        .map_err(invalid_format)?;
                }
            }

            let mut secondary = OptionList::new();
            populate_metadata(&mut secondary, &self.config, self.config.encrypt_filename)?;
            let mut secondary_bytes = Vec::new();
            secondary
                .serialize(&mut secondary_bytes)
                .map_err(invalid_format)?;

            let nonce_prefix = key::gen_random(AES_BLOCK_LEN);
            let mut pre_plaintext = Vec::new();
            pre_plaintext.extend_from_slice(&nonce_prefix);
            pre_plaintext.extend_from_slice(&secondary_bytes);
            write_u64(&mut pre_plaintext, compressed.len() as u64).map_err(invalid_format)?;
            pre_plaintext.extend_from_slice(&compressed);
            pre_plaintext.extend_from_slice(&plaintext_hash);

            let aes = Ciphers::initialize(&k, &iv).map_err(invalid_format)?;
            let ciphertext = aes.encrypt(&pre_plaintext);

            let primary_header_bytes = header.to_bytes().map_err(invalid_format)?;
            let mut hmac_message = Vec::new();
            hmac_message.extend_from_slice(&iv);
            hmac_message.extend_from_slice(&ciphertext);
            hmac_message.extend_from_slice(&primary_header_bytes);
            let hmac = cipher::hmac_compute(&k, self.config.hash_fn, &hmac_message);

            payload_bytes = ciphertext;
            sign_preimage = hmac.clone();
            integrity = hmac;
        } else {
            populate_metadata(&mut header.options, &self.config, true)?;
            payload_bytes = compressed;
            integrity = plaintext_hash.clone();
            sign_preimage = plaintext_hash;
        }

        let primary_header_bytes = header.to_bytes().map_err(invalid_format)?;

        let mut out = primary_header_bytes;
        write_u64(&mut out, payload_bytes.len() as u64).map_err(invalid_format)?;
        out.extend_from_slice(&payload_bytes);
        out.extend_from_slice(&integrity);

        write_u16(&mut out, self.config.signing.len() as u16).map_err(invalid_format)?;
        for signing in &self.config.signing {
            let sig = signing.key.sign(&sign_preimage).map_err(invalid_format)?;
            write_u16(&mut out, signing.key.algorithm_id().wire()).map_err(invalid_format)?;
            write_len16_bytes(&mut out, signing.key_id.as_deref().unwrap_or("").as_bytes())
                .map_err(invalid_format)?;
            write_len16_bytes(&mut out, &sig).map_err(invalid_format)?;
        }

        self.state = WriteState::Emitted;
        self.progress.emit(ProgressEvent::Emitted {
            total_bytes: out.len() as u64,
        });
        self.state = WriteState::Closed;
        self.progress.emit(ProgressEvent::Closed);

        Ok(out)
    }
}

/// Builds the fixed-shape single-byte stream for an empty-directory entry (§4.1.4).
///
/// `path` MUST end in `/`; the resulting stream has `compression = None`, no signatures, no
/// timestamps, and a one-byte payload (`'/'`).
pub fn encode_empty_directory(path: &str, version: FormatVersion, hash_fn: HashId) -> Result<Vec<u8>> {
    if !path.ends_with('/') {
        return Err(Error::InvalidFormat(
            "empty-directory path must end with '/'".into(),
        ));
    }
    let mut config = WriteConfig::new(version, CompressionId::None, hash_fn);
    config.filename = Some(path.to_string());
    let mut writer = StreamWriter::new(config);
    writer.push(b"/")?;
    writer.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    HeaderParsed,
    EncryptedWaitingKey,
    PayloadLoaded,
    Decrypted,
    Decompressed,
    Verified,
    Closed,
    Failed,
}

/// One parsed-but-unverified signature block, as stored on the wire.
#[derive(Debug, Clone)]
pub struct SignatureRecord {
    pub algorithm: AsymmetricId,
    pub key_id: Option<String>,
    pub signature: Vec<u8>,
}

/// The result of a fully decoded and verified stream (§4.1.3).
pub struct DecodedEntry {
    pub plaintext: Vec<u8>,
    pub filename: Option<String>,
    pub created_time: Option<i64>,
    pub modified_time: Option<i64>,
    pub comment: Option<String>,
    pub user_options: OptionList,
    /// The bytes that were actually signed (the HMAC if encrypted, else the plaintext hash) -
    /// pass this to [`SignatureRecord`] verification.
    pub signed_preimage: Vec<u8>,
    pub signatures: Vec<SignatureRecord>,
}

impl DecodedEntry {
    /// Verifies each signature record against `verifying_keys`, matched by algorithm id. Records
    /// whose algorithm has no matching key verify as `false` (§7 `SignatureUnverified`).
    #[must_use]
    pub fn verify_signatures(&self, verifying_keys: &[VerifyingKey]) -> Vec<bool> {
        self.signatures
            .iter()
            .map(|record| {
                verifying_keys
                    .iter()
                    .filter(|vk| vk.algorithm_id() == record.algorithm)
                    .any(|vk| vk.verify(&self.signed_preimage, &record.signature))
            })
            .collect()
    }
}

/// A single-use, decompress-mode `StreamCodec` (§4.1.1).
pub struct StreamReader {
    state: ReadState,
    header: StreamHeader,
    payload_bytes: Vec<u8>,
    integrity: Vec<u8>,
    signatures: Vec<SignatureRecord>,
    compressed_payload: Option<Vec<u8>>,
    stored_plaintext_hash: Option<Vec<u8>>,
    secondary_options: Option<OptionList>,
    progress: ProgressBus,
}

impl StreamReader {
    /// Parses the header, payload section, integrity value and signature blocks (§4.1.3 steps
    /// 1-2).
    pub fn open(mut reader: impl Read) -> Result<Self> {
        let header = StreamHeader::deserialize(&mut reader)?;

        let payload_len = read_u64(&mut reader).map_err(invalid_format)?;
        let mut payload_bytes = vec![0u8; payload_len as usize];
        reader
            .read_exact(&mut payload_bytes)
            .map_err(|e| invalid_format(anyhow::Error::new(e).context("Unable to read payload section")))?;

        let mut integrity = vec![0u8; header.hash_fn.output_len()];
        reader
            .read_exact(&mut integrity)
            .map_err(|e| invalid_format(anyhow::Error::new(e).context("Unable to read integrity value")))?;

        let sig_count = read_u16(&mut reader).map_err(invalid_format)?;
        let mut signatures = Vec::with_capacity(sig_count as usize);
        for _ in 0..sig_count {
            let algorithm = AsymmetricId::from_wire(read_u16(&mut reader).map_err(invalid_format)?)
                .map_err(|e| Error::UnsupportedFeature(e.to_string()))?;
            let key_id_bytes = read_len16_bytes(&mut reader).map_err(invalid_format)?;
            let key_id = if key_id_bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8(key_id_bytes).map_err(|e| invalid_format(e.into()))?)
            };
            let signature = read_len16_bytes(&mut reader).map_err(invalid_format)?;
            signatures.push(SignatureRecord {
                algorithm,
                key_id,
                signature,
            });
        }

        let mut progress = ProgressBus::new();
        progress.emit(ProgressEvent::HeaderParsed);

        let (state, compressed_payload, stored_plaintext_hash) = if header.encryption == EncryptionId::Aes {
            progress.emit(ProgressEvent::EncryptedWaitingKey);
            (ReadState::EncryptedWaitingKey, None, None)
        } else {
            progress.emit(ProgressEvent::PayloadLoaded {
                bytes: payload_bytes.len() as u64,
            });
            (
                ReadState::PayloadLoaded,
                Some(payload_bytes.clone()),
                Some(integrity.clone()),
            )
        };

        Ok(StreamReader {
            state,
            header,
            payload_bytes,
            integrity,
            signatures,
            compressed_payload,
            stored_plaintext_hash,
            secondary_options: None,
            progress,
        })
    }

    pub fn progress_bus(&mut self) -> &mut ProgressBus {
        &mut self.progress
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.header.encryption == EncryptionId::Aes
    }

    #[must_use]
    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// The integrity value stored on the wire (HMAC if encrypted, plaintext hash otherwise) -
    /// exposed so callers (e.g. the archive manifest) can bind it without decrypting.
    #[must_use]
    pub fn integrity(&self) -> &[u8] {
        &self.integrity
    }

    /// Derives the key from `password` and attempts decryption (§4.1.3 steps 3-5).
    pub fn decrypt_with_password(&mut self, password: Protected<Vec<u8>>) -> Result<()> {
        self.decrypt_inner(None, Some(password))
    }

    /// Decrypts using a caller-supplied raw key rather than a password.
    pub fn decrypt_with_key(&mut self, raw_key: Protected<Vec<u8>>) -> Result<()> {
        self.decrypt_inner(Some(raw_key), None)
    }

    fn decrypt_inner(
        &mut self,
        raw_key: Option<Protected<Vec<u8>>>,
        password: Option<Protected<Vec<u8>>>,
    ) -> Result<()> {
        if self.state != ReadState::EncryptedWaitingKey {
            return Err(Error::InvalidState(
                "decrypt() is only valid in the EncryptedWaitingKey state",
            ));
        }

        let salt = self
            .header
            .salt()
            .ok_or_else(|| Error::InvalidFormat("encrypted stream is missing its salt".into()))?
            .to_vec();
        let iv = self
            .header
            .iv()
            .ok_or_else(|| Error::InvalidFormat("encrypted stream is missing its IV".into()))?
            .to_vec();
        let wire_iterations = self
            .header
            .pbkdf2_wire_iterations()
            .map_err(invalid_format)?
            .ok_or_else(|| Error::InvalidFormat("encrypted stream is missing its PBKDF2 iteration count".into()))?;
        let total_iterations = key::cycles_from_wire(wire_iterations).map_err(invalid_format)?;
        let key_len = KeyBits::from_key_len(salt.len())
            .map_err(invalid_format)?
            .key_len();

        let k = match (raw_key, password) {
            (Some(raw), _) => raw,
            (None, Some(password)) => {
                key::derive_key(password, &salt, total_iterations, self.header.hash_fn, key_len)
                    .map_err(invalid_format)?
            }
            (None, None) => {
                return Err(Error::InvalidState(
                    "decrypt() requires either a password or a raw key",
                ))
            }
        };

        let primary_header_bytes = self.header.to_bytes().map_err(invalid_format)?;
        let mut hmac_message = Vec::new();
        hmac_message.extend_from_slice(&iv);
        hmac_message.extend_from_slice(&self.payload_bytes);
        hmac_message.extend_from_slice(&primary_header_bytes);

        if !cipher::hmac_verify(&k, self.header.hash_fn, &hmac_message, &self.integrity) {
            self.state = ReadState::Failed;
            return Err(Error::IntegrityFailure);
        }
        self.state = ReadState::Decrypted;
        self.progress.emit(ProgressEvent::Decrypted);

        let aes = Ciphers::initialize(&k, &iv).map_err(invalid_format)?;
        let padded_plaintext = aes.decrypt(&self.payload_bytes).map_err(|_| {
            self.state = ReadState::Failed;
            Error::IntegrityFailure
        })?;

        if padded_plaintext.len() < AES_BLOCK_LEN {
            self.state = ReadState::Failed;
            return Err(Error::InvalidFormat(
                "decrypted pre-image is shorter than the nonce prefix".into(),
            ));
        }
        let rest = &padded_plaintext[AES_BLOCK_LEN..];
        let mut cursor = Cursor::new(rest);
        let secondary = OptionList::deserialize(&mut cursor).map_err(invalid_format)?;
        let compressed_len = read_u64(&mut cursor).map_err(invalid_format)?;
        let mut compressed = vec![0u8; compressed_len as usize];
        cursor
            .read_exact(&mut compressed)
            .map_err(|e| invalid_format(anyhow::Error::new(e).context("Unable to read compressed payload")))?;
        let mut stored_hash = vec![0u8; self.header.hash_fn.output_len()];
        cursor
            .read_exact(&mut stored_hash)
            .map_err(|e| invalid_format(anyhow::Error::new(e).context("Unable to read plaintext hash")))?;

        self.secondary_options = Some(secondary);
        self.compressed_payload = Some(compressed);
        self.stored_plaintext_hash = Some(stored_hash);

        Ok(())
    }

    /// Decompresses, verifies the plaintext hash, and returns the decoded entry (§4.1.3 steps
    /// 6-8).
    pub fn finish(mut self) -> Result<DecodedEntry> {
        if !matches!(self.state, ReadState::PayloadLoaded | ReadState::Decrypted) {
            return Err(Error::InvalidState(
                "finish() requires a loaded (and, if encrypted, decrypted) payload",
            ));
        }

        let compressed = self
            .compressed_payload
            .take()
            .ok_or_else(|| Error::InvalidState("no compressed payload available"))?;
        let stored_hash = self
            .stored_plaintext_hash
            .take()
            .ok_or_else(|| Error::InvalidState("no stored plaintext hash available"))?;

        let mut decompressor = DecompressorSink::new(self.header.compression);
        decompressor.push(&compressed).map_err(invalid_format)?;
        let plaintext = decompressor.finish().map_err(invalid_format)?;
        self.state = ReadState::Decompressed;
        self.progress.emit(ProgressEvent::Decompressed {
            bytes: plaintext.len() as u64,
        });

        let computed_hash = cipher::hash(self.header.hash_fn, &plaintext);
        if !ct_eq(&computed_hash, &stored_hash) {
            self.state = ReadState::Failed;
            return Err(Error::IntegrityFailure);
        }
        self.state = ReadState::Verified;
        self.progress.emit(ProgressEvent::Verified);

        let (filename, created_time, modified_time, comment, user_options) =
            if let Some(secondary) = &self.secondary_options {
                (
                    secondary
                        .get(keys::FILENAME)
                        .map(|e| e.values[0].as_str())
                        .transpose()
                        .map_err(invalid_format)?
                        .or(self.header.filename().map_err(invalid_format)?),
                    option_i64(secondary, keys::CREATED_TIME)?,
                    option_i64(secondary, keys::MODIFIED_TIME)?,
                    secondary
                        .get(keys::COMMENT)
                        .map(|e| e.values[0].as_str())
                        .transpose()
                        .map_err(invalid_format)?,
                    strip_known_keys(secondary),
                )
            } else {
                (
                    self.header.filename().map_err(invalid_format)?,
                    option_i64(&self.header.options, keys::CREATED_TIME)?,
                    option_i64(&self.header.options, keys::MODIFIED_TIME)?,
                    self.header
                        .options
                        .get(keys::COMMENT)
                        .map(|e| e.values[0].as_str())
                        .transpose()
                        .map_err(invalid_format)?,
                    strip_known_keys(&self.header.options),
                )
            };

        self.state = ReadState::Closed;
        self.progress.emit(ProgressEvent::Closed);

        Ok(DecodedEntry {
            plaintext,
            filename,
            created_time,
            modified_time,
            comment,
            user_options,
            signed_preimage: self.integrity,
            signatures: self.signatures,
        })
    }
}

fn option_i64(options: &OptionList, key: &str) -> Result<Option<i64>> {
    options
        .get(key)
        .map(|e| e.values[0].as_i64())
        .transpose()
        .map_err(invalid_format)
}

/// Every user-supplied option minus the ones this module manages itself (filename, timestamps,
/// comment, and the crypto bookkeeping fields), so `DecodedEntry::user_options` reflects only
/// what the caller actually set.
fn strip_known_keys(options: &OptionList) -> OptionList {
    let known = [
        keys::SALT,
        keys::IV,
        keys::PBKDF2_ITER,
        keys::WRAPPED_KEY,
        keys::FILENAME,
        keys::CREATED_TIME,
        keys::MODIFIED_TIME,
        keys::COMMENT,
        keys::ENCRYPTED_OPTIONS_MASK,
    ];
    let mut out = OptionList::new();
    for entry in options.iter() {
        if !known.contains(&entry.key.as_str()) {
            let _ = out.push(entry.key.clone(), entry.version, entry.values.clone());
        }
    }
    out
}

/// Validates that a decoded entry matches the fixed empty-directory shape (§4.1.4): a one-byte
/// `'/'` payload, no compression, and a path ending in `/`.
pub fn validate_empty_directory(entry: &DecodedEntry) -> Result<()> {
    let path = entry
        .filename
        .as_deref()
        .ok_or_else(|| Error::InvalidFormat("empty-directory entry has no path".into()))?;
    if !path.ends_with('/') {
        return Err(Error::InvalidFormat(
            "empty-directory entry path does not end with '/'".into(),
        ));
    }
    if entry.plaintext != b"/" {
        return Err(Error::InvalidFormat(
            "empty-directory entry payload must be exactly the byte '/'".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(bytes: &[u8]) -> Protected<Vec<u8>> {
        Protected::new(bytes.to_vec())
    }

    #[test]
    fn roundtrip_no_encryption_no_compression() {
        let config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        let mut writer = StreamWriter::new(config);
        writer.push(b"hello world").unwrap();
        let bytes = writer.finish().unwrap();

        let reader = StreamReader::open(Cursor::new(bytes)).unwrap();
        assert!(!reader.is_encrypted());
        let decoded = reader.finish().unwrap();
        assert_eq!(decoded.plaintext, b"hello world");
    }

    #[test]
    fn roundtrip_deflate_with_filename() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::Deflate, HashId::Sha256);
        config.filename = Some("hello.txt".into());
        let mut writer = StreamWriter::new(config);
        writer.push(b"Hello, World!\n").unwrap();
        let bytes = writer.finish().unwrap();

        let decoded = StreamReader::open(Cursor::new(bytes)).unwrap().finish().unwrap();
        assert_eq!(decoded.plaintext, b"Hello, World!\n");
        assert_eq!(decoded.filename.as_deref(), Some("hello.txt"));
    }

    #[test]
    fn roundtrip_aes256_with_password() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.encryption = Some(EncryptionParams {
            key_bits: KeyBits::Aes256,
            password: Some(password(b"password")),
            raw_key: None,
            pbkdf2_user_cycles: 1000,
            wrap_public_key: None,
        });
        let mut writer = StreamWriter::new(config);
        writer.push(b"secret").unwrap();
        let bytes = writer.finish().unwrap();

        let header = StreamHeader::deserialize(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(
            header.pbkdf2_wire_iterations().unwrap(),
            Some(1000),
            "the wire field must hold the bare user-visible cycle count, not the PBKDF2 total"
        );

        let mut reader = StreamReader::open(Cursor::new(bytes)).unwrap();
        assert!(reader.is_encrypted());
        reader.decrypt_with_password(password(b"password")).unwrap();
        let decoded = reader.finish().unwrap();
        assert_eq!(decoded.plaintext, b"secret");
    }

    #[test]
    fn wrong_password_fails_integrity_check() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.encryption = Some(EncryptionParams {
            key_bits: KeyBits::Aes256,
            password: Some(password(b"password")),
            raw_key: None,
            pbkdf2_user_cycles: 1000,
            wrap_public_key: None,
        });
        let mut writer = StreamWriter::new(config);
        writer.push(b"secret").unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = StreamReader::open(Cursor::new(bytes)).unwrap();
        let err = reader.decrypt_with_password(password(b"Password")).unwrap_err();
        assert!(matches!(err, Error::IntegrityFailure));
        assert!(err.is_retryable());
    }

    #[test]
    fn encrypted_filename_is_hidden_from_primary_header() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.filename = Some("hidden".into());
        config.encrypt_filename = true;
        config.encryption = Some(EncryptionParams {
            key_bits: KeyBits::Aes128,
            password: Some(password(b"pw")),
            raw_key: None,
            pbkdf2_user_cycles: 1000,
            wrap_public_key: None,
        });
        let mut writer = StreamWriter::new(config);
        writer.push(b"x").unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = StreamReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().filename().unwrap(), None);
        reader.decrypt_with_password(password(b"pw")).unwrap();
        let decoded = reader.finish().unwrap();
        assert_eq!(decoded.filename.as_deref(), Some("hidden"));
        assert_eq!(decoded.plaintext, b"x");
    }

    #[test]
    fn tampered_ciphertext_fails_integrity_on_decrypt() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.encryption = Some(EncryptionParams {
            key_bits: KeyBits::Aes256,
            password: Some(password(b"password")),
            raw_key: None,
            pbkdf2_user_cycles: 1000,
            wrap_public_key: None,
        });
        let mut writer = StreamWriter::new(config);
        writer.push(b"secret").unwrap();
        let mut bytes = writer.finish().unwrap();

        let flip_at = bytes.len() - 40;
        bytes[flip_at] ^= 0x01;

        let mut reader = StreamReader::open(Cursor::new(bytes)).unwrap();
        let err = reader.decrypt_with_password(password(b"password")).unwrap_err();
        assert!(matches!(err, Error::IntegrityFailure));
    }

    #[test]
    fn empty_directory_shape_is_exact() {
        let bytes = encode_empty_directory("dir/", FormatVersion::V93, HashId::Sha256).unwrap();
        let decoded = StreamReader::open(Cursor::new(bytes)).unwrap().finish().unwrap();
        assert_eq!(decoded.plaintext, b"/");
        assert_eq!(decoded.filename.as_deref(), Some("dir/"));
        validate_empty_directory(&decoded).unwrap();
    }

    #[test]
    fn signed_entry_verifies_with_matching_key() {
        let signing_key = crate::signature::SigningKey::Ecdsa(Box::new(
            p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng),
        ));
        let verifying_key = signing_key.verifying_key();

        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.signing.push(SigningParams {
            key: signing_key,
            key_id: Some("k1".into()),
        });
        let mut writer = StreamWriter::new(config);
        writer.push(b"signed payload").unwrap();
        let bytes = writer.finish().unwrap();

        let decoded = StreamReader::open(Cursor::new(bytes)).unwrap().finish().unwrap();
        assert_eq!(decoded.signatures.len(), 1);
        assert_eq!(decoded.signatures[0].key_id.as_deref(), Some("k1"));
        assert_eq!(decoded.verify_signatures(&[verifying_key]), vec![true]);
    }
}
