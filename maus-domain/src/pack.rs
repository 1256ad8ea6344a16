//! Packs a directory tree into a single `.mauz` archive (§5 "packing/unpacking a directory
//! tree").
//!
//! Grounded on the shape of `dexios-domain::pack` (a `Request`/`Error`/`execute` triple), but
//! there's no intermediate zip file to build and encrypt as a whole - each file becomes its own
//! `.maus` entry stream, encrypted independently, and the archive binds them with a manifest
//! instead of a zip central directory.

use std::path::Path;

use maus_core::primitives::{CompressionId, FormatVersion, HashId};
use maus_core::protected::Protected;
use maus_core::stream::{EncryptionParams, SigningParams, WriteConfig};

use crate::archive::{ArchiveSigningParams, ArchiveWriter};
use crate::storage::{Storage, WalkedEntry};

#[derive(Debug)]
pub enum Error {
    ReadSource,
    Archive(maus_core::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ReadSource => f.write_str("Unable to read a source file"),
            Error::Archive(inner) => write!(f, "Unable to build archive: {inner}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<maus_core::Error> for Error {
    fn from(value: maus_core::Error) -> Self {
        Error::Archive(value)
    }
}

/// Per-entry encryption, shared by every file packed in one request. Each entry still gets its
/// own salt/IV/derived key (§4.1.2) - only the password and cipher strength are shared.
///
/// The password is kept as plain bytes here, not a [`Protected`], because one [`Protected`] is
/// consumed per file (`StreamWriter::finish` takes its `EncryptionParams` by value) - a fresh
/// wrapper is minted for each entry from this shared copy.
pub struct PackEncryption {
    pub key_bits: maus_core::cipher::KeyBits,
    pub password: Option<Vec<u8>>,
    pub raw_key: Option<Vec<u8>>,
    pub pbkdf2_user_cycles: u32,
    pub encrypt_filenames: bool,
}

pub struct Request<'a> {
    pub root: &'a Path,
    pub version: FormatVersion,
    pub compression: CompressionId,
    pub hash_fn: HashId,
    pub encryption: Option<PackEncryption>,
    pub entry_signing: Vec<SigningParams>,
    pub archive_signing: Vec<ArchiveSigningParams>,
}

/// Walks `req.root` via `stor`, packs every file and empty directory found into a `.mauz`
/// archive, and returns the finished archive bytes.
pub fn execute(stor: &dyn Storage, req: Request<'_>) -> Result<Vec<u8>, Error> {
    let mut walked = stor.walk(req.root).map_err(|_| Error::ReadSource)?;
    walked.sort_by_key(|e| match e {
        WalkedEntry::File(p) | WalkedEntry::EmptyDirectory(p) => p.clone(),
    });

    let mut writer = ArchiveWriter::new(req.version);

    for entry in walked {
        match entry {
            WalkedEntry::File(relative) => {
                let path_str = relative.to_string_lossy().into_owned();
                let contents = stor
                    .read_file(&req.root.join(&relative))
                    .map_err(|_| Error::ReadSource)?;

                let mut config = WriteConfig::new(req.version, req.compression, req.hash_fn);
                config.filename = Some(path_str.clone());
                config.signing = clone_signing(&req.entry_signing);

                if let Some(enc) = &req.encryption {
                    config.encrypt_filename = enc.encrypt_filenames;
                    config.encryption = Some(EncryptionParams {
                        key_bits: enc.key_bits,
                        password: enc.password.clone().map(Protected::new),
                        raw_key: enc.raw_key.clone().map(Protected::new),
                        pbkdf2_user_cycles: enc.pbkdf2_user_cycles,
                        wrap_public_key: None,
                    });
                }

                writer.add_file(&path_str, config, &contents)?;
            }
            WalkedEntry::EmptyDirectory(relative) => {
                let mut path_str = relative.to_string_lossy().into_owned();
                if !path_str.ends_with('/') {
                    path_str.push('/');
                }
                writer.add_empty_directory(&path_str, req.hash_fn)?;
            }
        }
    }

    Ok(writer.finish(maus_core::options::OptionList::new(), req.hash_fn, req.archive_signing)?)
}

fn clone_signing(signing: &[SigningParams]) -> Vec<SigningParams> {
    signing
        .iter()
        .map(|s| SigningParams {
            key: s.key.clone(),
            key_id: s.key_id.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;
    use crate::entry::Entry;
    use crate::storage::InMemoryStorage;

    #[test]
    fn packs_plaintext_files_and_empty_dirs() {
        let stor = InMemoryStorage::default();
        stor.put_file("root/a.txt", b"A".to_vec());
        stor.put_file("root/sub/b.txt", b"B".to_vec());
        stor.put_empty_dir("root/empty");

        let req = Request {
            root: Path::new("root"),
            version: FormatVersion::V93,
            compression: CompressionId::None,
            hash_fn: HashId::Sha256,
            encryption: None,
            entry_signing: Vec::new(),
            archive_signing: Vec::new(),
        };

        let archive_bytes = execute(&stor, req).unwrap();
        let reader = ArchiveReader::open(&archive_bytes).unwrap();
        assert_eq!(reader.entries().len(), 3);

        let paths: Vec<String> = reader.entries().iter().map(|e| e.path().unwrap()).collect();
        assert!(paths.iter().any(|p| p == "a.txt"));
        assert!(paths.iter().any(|p| p == "sub/b.txt"));
        assert!(paths.iter().any(|p| p == "empty/"));

        for entry in reader.entries() {
            if let Entry::File(f) = entry {
                if f.path == "a.txt" {
                    assert_eq!(f.plaintext, b"A");
                }
            }
        }
    }

    #[test]
    fn packs_encrypted_files() {
        let stor = InMemoryStorage::default();
        stor.put_file("root/secret.txt", b"shh".to_vec());

        let req = Request {
            root: Path::new("root"),
            version: FormatVersion::V93,
            compression: CompressionId::Deflate,
            hash_fn: HashId::Sha256,
            encryption: Some(PackEncryption {
                key_bits: maus_core::cipher::KeyBits::Aes256,
                password: Some(b"pw".to_vec()),
                raw_key: None,
                pbkdf2_user_cycles: 1000,
                encrypt_filenames: false,
            }),
            entry_signing: Vec::new(),
            archive_signing: Vec::new(),
        };

        let archive_bytes = execute(&stor, req).unwrap();
        let mut reader = ArchiveReader::open(&archive_bytes).unwrap();
        assert_eq!(reader.entries()[0].path().as_deref(), Some("secret.txt"));
        reader
            .decrypt_with_password(0, Protected::new(b"pw".to_vec()))
            .unwrap();
        let Entry::File(f) = &reader.entries()[0] else {
            panic!("expected file entry");
        };
        assert_eq!(f.plaintext, b"shh");
    }
}
