//! `ArchiveFramer`: the multi-entry `.mauz` container built from `StreamCodec` instances and an
//! integrity-binding manifest (§4.2).
//!
//! There's no direct teacher counterpart - `dexios` archives via a plain zip file, with no
//! manifest of its own - so the write/read split here is grounded on the shape of
//! `dexios-domain`'s `pack`/`unpack` `Request`/`execute` pair, adapted to this format's
//! self-delimiting entry streams instead of zip's central directory.

use std::collections::HashSet;
use std::io::Cursor;

use maus_core::options::OptionList;
use maus_core::primitives::{
    ct_eq, read_len16_bytes, read_u16, write_len16_bytes, write_u16, CompressionId, FormatVersion,
    HashId, ARCHIVE_MAGIC,
};
use maus_core::protected::Protected;
use maus_core::signature::{AsymmetricId, SigningKey, VerifyingKey};
use maus_core::stream::{validate_empty_directory, StreamWriter, WriteConfig};
use maus_core::{Error, Result};

use crate::entry::{Entry, EmptyDirectoryEntry, FileEntry, UnknownEntry};
use crate::manifest::Manifest;

/// One archive-level signature block, mirroring [`maus_core::stream::SignatureRecord`] but bound
/// to the manifest rather than a single entry.
pub struct ArchiveSigningParams {
    pub key: SigningKey,
    pub key_id: Option<String>,
}

/// Builds a `.mauz` archive by accumulating finalized entry streams, then framing them behind a
/// manifest (§4.2.1).
pub struct ArchiveWriter {
    version: FormatVersion,
    seen_paths: HashSet<String>,
    entries: Vec<(String, Vec<u8>, Vec<u8>)>,
}

impl ArchiveWriter {
    #[must_use]
    pub fn new(version: FormatVersion) -> Self {
        ArchiveWriter {
            version,
            seen_paths: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Adds a pre-built, finalized entry stream, recording `integrity` for the manifest.
    ///
    /// Rejects a `path` already present in this archive, case-sensitively (§4.2.1 step 1).
    pub fn add_entry(&mut self, path: &str, stream_bytes: Vec<u8>, integrity: Vec<u8>) -> Result<()> {
        if !self.seen_paths.insert(path.to_string()) {
            return Err(Error::DuplicatePath(path.to_string()));
        }
        self.entries.push((path.to_string(), stream_bytes, integrity));
        Ok(())
    }

    /// Builds and adds a file entry in one step: runs `config` through a [`StreamWriter`], then
    /// records the path and resulting integrity value.
    ///
    /// `path` is always the manifest's canonical path for this entry, independent of whether
    /// `config.filename` is present in the primary header (it may be hidden via
    /// `config.encrypt_filename`).
    pub fn add_file(&mut self, path: &str, config: WriteConfig, plaintext: &[u8]) -> Result<()> {
        let mut writer = StreamWriter::new(config);
        writer.push(plaintext)?;
        let stream_bytes = writer.finish()?;
        let integrity = peek_integrity(&stream_bytes)?;
        self.add_entry(path, stream_bytes, integrity)
    }

    /// Builds and adds an empty-directory entry (§4.1.4). `path` MUST end in `/`.
    pub fn add_empty_directory(&mut self, path: &str, hash_fn: HashId) -> Result<()> {
        let stream_bytes = maus_core::stream::encode_empty_directory(path, self.version, hash_fn)?;
        let integrity = peek_integrity(&stream_bytes)?;
        self.add_entry(path, stream_bytes, integrity)
    }

    /// Assembles the manifest, signs it (if requested), and emits the complete archive (§4.2.1
    /// steps 3-5).
    pub fn finish(
        self,
        archive_options: OptionList,
        manifest_hash_fn: HashId,
        signing: Vec<ArchiveSigningParams>,
    ) -> Result<Vec<u8>> {
        let mut manifest = Manifest::new();
        for (i, (path, _, integrity)) in self.entries.iter().enumerate() {
            manifest
                .push(i as u64, path.clone(), integrity.clone())
                .map_err(Error::from)?;
        }
        let mut manifest_plaintext = Vec::new();
        manifest
            .serialize(&mut manifest_plaintext)
            .map_err(Error::from)?;

        let manifest_config = WriteConfig::new(self.version, CompressionId::None, manifest_hash_fn);
        let mut manifest_writer = StreamWriter::new(manifest_config);
        manifest_writer.push(&manifest_plaintext)?;
        let manifest_stream = manifest_writer.finish()?;
        let manifest_integrity = peek_integrity(&manifest_stream)?;

        let mut out = Vec::new();
        out.extend_from_slice(&ARCHIVE_MAGIC);
        write_u16(&mut out, self.version.wire()).map_err(Error::from)?;
        archive_options.serialize(&mut out).map_err(Error::from)?;
        out.extend_from_slice(&manifest_stream);
        for (_, stream_bytes, _) in &self.entries {
            out.extend_from_slice(stream_bytes);
        }

        write_u16(&mut out, signing.len() as u16).map_err(Error::from)?;
        for sig in &signing {
            let signature = sig.key.sign(&manifest_integrity).map_err(Error::from)?;
            write_u16(&mut out, sig.key.algorithm_id().wire()).map_err(Error::from)?;
            write_len16_bytes(&mut out, sig.key_id.as_deref().unwrap_or("").as_bytes())
                .map_err(Error::from)?;
            write_len16_bytes(&mut out, &signature).map_err(Error::from)?;
        }

        Ok(out)
    }
}

fn peek_integrity(stream_bytes: &[u8]) -> Result<Vec<u8>> {
    let reader = maus_core::stream::StreamReader::open(Cursor::new(stream_bytes))?;
    Ok(reader.integrity().to_vec())
}

/// One archive-level signature block as parsed from the wire.
pub struct ArchiveSignatureRecord {
    pub algorithm: AsymmetricId,
    pub key_id: Option<String>,
    pub signature: Vec<u8>,
}

/// Parses and holds a `.mauz` archive's entries (§4.2.2).
pub struct ArchiveReader {
    pub version: FormatVersion,
    pub options: OptionList,
    manifest: Manifest,
    manifest_integrity: Vec<u8>,
    entries: Vec<Entry>,
    pub archive_signatures: Vec<ArchiveSignatureRecord>,
}

impl ArchiveReader {
    /// Validates magic/version, parses archive options, decodes the manifest, and opens (but does
    /// not decrypt) every entry stream (§4.2.2 steps 1-3).
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        std::io::Read::read_exact(&mut cursor, &mut magic).map_err(Error::Io)?;
        if magic != ARCHIVE_MAGIC {
            return Err(Error::InvalidFormat("archive magic mismatch".into()));
        }
        let version_wire = read_u16(&mut cursor).map_err(Error::from)?;
        let version = FormatVersion::from_wire(version_wire)
            .ok_or_else(|| Error::InvalidFormat(format!("unrecognized archive version {version_wire}")))?;
        let options = OptionList::deserialize(&mut cursor).map_err(Error::from)?;

        let manifest_reader = maus_core::stream::StreamReader::open(&mut cursor)?;
        if manifest_reader.is_encrypted() {
            return Err(Error::UnsupportedFeature(
                "archive manifest entry must not be encrypted".into(),
            ));
        }
        let manifest_integrity = manifest_reader.integrity().to_vec();
        let manifest_decoded = manifest_reader.finish()?;
        let manifest = Manifest::deserialize(&mut Cursor::new(&manifest_decoded.plaintext))
            .map_err(Error::from)?;

        let mut entries = Vec::with_capacity(manifest.len());
        for i in 0..manifest.len() as u64 {
            let reader = maus_core::stream::StreamReader::open(&mut cursor)?;
            let integrity = reader.integrity().to_vec();
            let manifest_row = manifest
                .get(i)
                .ok_or_else(|| Error::InvalidFormat(format!("manifest has no row for index {i}")))?;

            if reader.is_encrypted() {
                entries.push(Entry::Unknown(UnknownEntry::new(i, integrity, reader)));
            } else {
                let decoded = reader.finish()?;
                let path = decoded
                    .filename
                    .clone()
                    .ok_or_else(|| Error::InvalidFormat("plaintext entry has no path".into()))?;
                if path != manifest_row.path {
                    return Err(Error::InvalidFormat(format!(
                        "entry {i} path {path:?} does not match manifest path {:?}",
                        manifest_row.path
                    )));
                }
                if !ct_eq(&integrity, &manifest_row.integrity) {
                    return Err(Error::IntegrityFailure);
                }
                if path.ends_with('/') {
                    validate_empty_directory(&decoded)?;
                    entries.push(Entry::EmptyDirectory(EmptyDirectoryEntry { index: i, path }));
                } else {
                    entries.push(Entry::File(FileEntry {
                        index: i,
                        path,
                        plaintext: decoded.plaintext,
                        created_time: decoded.created_time,
                        modified_time: decoded.modified_time,
                        comment: decoded.comment,
                        user_options: decoded.user_options,
                        signed_preimage: decoded.signed_preimage,
                        signatures: decoded.signatures,
                    }));
                }
            }
        }

        let sig_count = read_u16(&mut cursor).map_err(Error::from)?;
        let mut archive_signatures = Vec::with_capacity(sig_count as usize);
        for _ in 0..sig_count {
            let algorithm = AsymmetricId::from_wire(read_u16(&mut cursor).map_err(Error::from)?)
                .map_err(|e| Error::UnsupportedFeature(e.to_string()))?;
            let key_id_bytes = read_len16_bytes(&mut cursor).map_err(Error::from)?;
            let key_id = if key_id_bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8(key_id_bytes).map_err(|e| Error::from(anyhow::Error::from(e)))?)
            };
            let signature = read_len16_bytes(&mut cursor).map_err(Error::from)?;
            archive_signatures.push(ArchiveSignatureRecord {
                algorithm,
                key_id,
                signature,
            });
        }

        Ok(ArchiveReader {
            version,
            options,
            manifest,
            manifest_integrity,
            entries,
            archive_signatures,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Verifies the archive-level signature blocks against `verifying_keys` (matched by
    /// algorithm id).
    #[must_use]
    pub fn verify_archive_signatures(&self, verifying_keys: &[VerifyingKey]) -> Vec<bool> {
        self.archive_signatures
            .iter()
            .map(|record| {
                verifying_keys
                    .iter()
                    .filter(|vk| vk.algorithm_id() == record.algorithm)
                    .any(|vk| vk.verify(&self.manifest_integrity, &record.signature))
            })
            .collect()
    }

    /// Resolves an [`Entry::Unknown`] at `index` by password, atomically replacing it in the
    /// entry list with the concrete variant (§4.2.3).
    pub fn decrypt_with_password(&mut self, index: u64, password: Protected<Vec<u8>>) -> Result<()> {
        self.resolve(index, |u| u.decrypt_with_password(password))
    }

    /// As [`decrypt_with_password`], but with a caller-supplied raw key.
    ///
    /// [`decrypt_with_password`]: ArchiveReader::decrypt_with_password
    pub fn decrypt_with_key(&mut self, index: u64, raw_key: Protected<Vec<u8>>) -> Result<()> {
        self.resolve(index, |u| u.decrypt_with_key(raw_key))
    }

    fn resolve(&mut self, index: u64, f: impl FnOnce(UnknownEntry) -> Result<Entry>) -> Result<()> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.index() == index)
            .ok_or(Error::InvalidState("no entry with that index"))?;

        let taken = self.entries.remove(pos);
        let Entry::Unknown(unknown) = taken else {
            return Err(Error::InvalidState("entry is not an unresolved placeholder"));
        };

        let manifest_row = self
            .manifest
            .get(index)
            .ok_or_else(|| Error::InvalidFormat(format!("manifest has no row for index {index}")))?
            .clone();
        if !ct_eq(&unknown.integrity, &manifest_row.integrity) {
            return Err(Error::IntegrityFailure);
        }

        let resolved = f(unknown)?;
        if resolved.path().as_deref() != Some(manifest_row.path.as_str()) {
            return Err(Error::InvalidFormat(format!(
                "decrypted path does not match manifest path {:?}",
                manifest_row.path
            )));
        }

        self.entries.insert(pos, resolved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maus_core::cipher::KeyBits;
    use maus_core::stream::EncryptionParams;

    fn password(bytes: &[u8]) -> Protected<Vec<u8>> {
        Protected::new(bytes.to_vec())
    }

    #[test]
    fn roundtrip_two_plaintext_entries() {
        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer
            .add_file(
                "a",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"A",
            )
            .unwrap();
        writer
            .add_file(
                "b",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"B",
            )
            .unwrap();
        let bytes = writer
            .finish(OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let reader = ArchiveReader::open(&bytes).unwrap();
        assert_eq!(reader.entries().len(), 2);
        let Entry::File(a) = &reader.entries()[0] else {
            panic!("expected file entry");
        };
        assert_eq!(a.path, "a");
        assert_eq!(a.plaintext, b"A");
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer
            .add_file(
                "a",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"A",
            )
            .unwrap();
        let err = writer
            .add_file(
                "a",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"A2",
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePath(_)));
    }

    #[test]
    fn empty_directory_roundtrip() {
        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer.add_empty_directory("dir/", HashId::Sha256).unwrap();
        let bytes = writer
            .finish(OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let reader = ArchiveReader::open(&bytes).unwrap();
        let Entry::EmptyDirectory(dir) = &reader.entries()[0] else {
            panic!("expected empty directory entry");
        };
        assert_eq!(dir.path, "dir/");
    }

    #[test]
    fn encrypted_filename_resolves_via_unknown_placeholder() {
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

        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer.add_file("hidden", config, b"x").unwrap();
        let bytes = writer
            .finish(OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let mut reader = ArchiveReader::open(&bytes).unwrap();
        assert!(matches!(reader.entries()[0], Entry::Unknown(_)));

        reader.decrypt_with_password(0, password(b"pw")).unwrap();
        let Entry::File(resolved) = &reader.entries()[0] else {
            panic!("expected resolved file entry");
        };
        assert_eq!(resolved.path, "hidden");
        assert_eq!(resolved.plaintext, b"x");
    }

    #[test]
    fn manifest_exhaustiveness_after_roundtrip() {
        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer
            .add_file(
                "a",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"A",
            )
            .unwrap();
        writer
            .add_file(
                "b",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"B",
            )
            .unwrap();
        let bytes = writer
            .finish(OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let reader = ArchiveReader::open(&bytes).unwrap();
        for (i, entry) in reader.entries().iter().enumerate() {
            assert_eq!(entry.index(), i as u64);
            assert_eq!(entry.path().unwrap(), reader.manifest.get(i as u64).unwrap().path);
        }
    }

    #[test]
    fn truncated_signature_count_is_invalid_format_not_zero_signatures() {
        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer
            .add_file(
                "a",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"A",
            )
            .unwrap();
        let mut bytes = writer
            .finish(OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        // Drop the trailing signature-count field entirely, simulating truncation.
        bytes.truncate(bytes.len() - 2);
        let err = ArchiveReader::open(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
