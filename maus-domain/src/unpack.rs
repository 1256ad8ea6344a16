//! Unpacks a `.mauz` archive to a directory tree (§5 "packing/unpacking a directory tree").
//!
//! Grounded on the shape of `dexios-domain::unpack` (a `Request`/`Error`/`execute` triple that
//! decrypts then extracts), but there's no temporary zip file to decrypt as a whole and erase
//! afterwards: the archive is already a parsed [`ArchiveReader`], and any entry whose filename is
//! itself encrypted is resolved here, one [`Protected`] wrapper minted per entry, the same way
//! [`crate::pack`] mints one per entry on the way in.

use std::path::{Component, Path, PathBuf};

use maus_core::protected::Protected;

use crate::archive::ArchiveReader;
use crate::entry::Entry;
use crate::storage::Storage;

#[derive(Debug)]
pub enum Error {
    WriteData,
    UnsafePath(String),
    UnresolvedEntry(u64),
    Archive(maus_core::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::WriteData => f.write_str("Unable to write extracted data"),
            Error::UnsafePath(path) => write!(f, "Refusing to extract unsafe path: {path}"),
            Error::UnresolvedEntry(index) => {
                write!(f, "Entry {index} has an encrypted filename and no password/key was given")
            }
            Error::Archive(inner) => write!(f, "Archive error: {inner}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<maus_core::Error> for Error {
    fn from(value: maus_core::Error) -> Self {
        Error::Archive(value)
    }
}

/// Key material used to resolve entries whose filename is itself encrypted (§4.2.3). Kept as
/// plain bytes, not a [`Protected`], for the same reason as `pack::PackEncryption::password`: one
/// [`Protected`] is minted per entry resolved, since `ArchiveReader::decrypt_with_password` takes
/// its argument by value.
pub enum UnresolvedKey {
    Password(Vec<u8>),
    RawKey(Vec<u8>),
}

pub struct Request<'a> {
    pub archive: ArchiveReader,
    pub output_dir: &'a Path,
    pub unresolved_key: Option<UnresolvedKey>,
}

/// Resolves any `Entry::Unknown` placeholders (if key material was given), then writes every
/// file and empty directory to `req.output_dir` via `stor`.
pub fn execute(stor: &dyn Storage, req: Request<'_>) -> Result<(), Error> {
    let mut archive = req.archive;

    let unknown_indices: Vec<u64> = archive
        .entries()
        .iter()
        .filter(|e| matches!(e, Entry::Unknown(_)))
        .map(Entry::index)
        .collect();

    for index in unknown_indices {
        match &req.unresolved_key {
            Some(UnresolvedKey::Password(password)) => {
                archive.decrypt_with_password(index, Protected::new(password.clone()))?;
            }
            Some(UnresolvedKey::RawKey(raw_key)) => {
                archive.decrypt_with_key(index, Protected::new(raw_key.clone()))?;
            }
            None => return Err(Error::UnresolvedEntry(index)),
        }
    }

    for entry in archive.entries() {
        let path = entry.path().expect("every entry is resolved by this point");
        let relative = safe_relative_path(&path)?;
        let full_path = req.output_dir.join(&relative);

        match entry {
            Entry::File(f) => {
                stor.write_file(&full_path, &f.plaintext).map_err(|_| Error::WriteData)?;
            }
            Entry::EmptyDirectory(_) => {
                stor.create_dir_all(&full_path).map_err(|_| Error::WriteData)?;
            }
            Entry::Unknown(_) => unreachable!("resolved above"),
        }
    }

    Ok(())
}

/// Rejects a manifest/entry path containing `..` or an absolute root, the zip-slip defense
/// (<https://snyk.io/research/zip-slip-vulnerability>) applied to this format's own path strings
/// instead of a zip central directory.
fn safe_relative_path(path: &str) -> Result<PathBuf, Error> {
    let candidate = PathBuf::from(path);
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafePath(path.to_string()));
            }
        }
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maus_core::cipher::KeyBits;
    use maus_core::primitives::{CompressionId, FormatVersion, HashId};
    use maus_core::stream::{EncryptionParams, WriteConfig};

    use crate::archive::ArchiveWriter;
    use crate::storage::InMemoryStorage;

    #[test]
    fn unpacks_plaintext_files_and_empty_dirs() {
        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer
            .add_file(
                "a.txt",
                WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256),
                b"A",
            )
            .unwrap();
        writer.add_empty_directory("empty/", HashId::Sha256).unwrap();
        let bytes = writer
            .finish(maus_core::options::OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let archive = ArchiveReader::open(&bytes).unwrap();
        let stor = InMemoryStorage::default();
        execute(
            &stor,
            Request {
                archive,
                output_dir: Path::new("out"),
                unresolved_key: None,
            },
        )
        .unwrap();

        assert_eq!(stor.get_file(Path::new("out/a.txt")).unwrap(), b"A");
    }

    #[test]
    fn unpacks_encrypted_filename_with_password() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.filename = Some("hidden".into());
        config.encrypt_filename = true;
        config.encryption = Some(EncryptionParams {
            key_bits: KeyBits::Aes128,
            password: Some(Protected::new(b"pw".to_vec())),
            raw_key: None,
            pbkdf2_user_cycles: 1000,
            wrap_public_key: None,
        });

        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer.add_file("hidden", config, b"x").unwrap();
        let bytes = writer
            .finish(maus_core::options::OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let archive = ArchiveReader::open(&bytes).unwrap();
        let stor = InMemoryStorage::default();
        execute(
            &stor,
            Request {
                archive,
                output_dir: Path::new("out"),
                unresolved_key: Some(UnresolvedKey::Password(b"pw".to_vec())),
            },
        )
        .unwrap();

        assert_eq!(stor.get_file(Path::new("out/hidden")).unwrap(), b"x");
    }

    #[test]
    fn unresolved_encrypted_filename_without_key_errors() {
        let mut config = WriteConfig::new(FormatVersion::V93, CompressionId::None, HashId::Sha256);
        config.filename = Some("hidden".into());
        config.encrypt_filename = true;
        config.encryption = Some(EncryptionParams {
            key_bits: KeyBits::Aes128,
            password: Some(Protected::new(b"pw".to_vec())),
            raw_key: None,
            pbkdf2_user_cycles: 1000,
            wrap_public_key: None,
        });

        let mut writer = ArchiveWriter::new(FormatVersion::V93);
        writer.add_file("hidden", config, b"x").unwrap();
        let bytes = writer
            .finish(maus_core::options::OptionList::new(), HashId::Sha256, Vec::new())
            .unwrap();

        let archive = ArchiveReader::open(&bytes).unwrap();
        let stor = InMemoryStorage::default();
        let err = execute(
            &stor,
            Request {
                archive,
                output_dir: Path::new("out"),
                unresolved_key: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedEntry(0)));
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(matches!(
            safe_relative_path("../escape.txt"),
            Err(Error::UnsafePath(_))
        ));
        assert!(safe_relative_path("sub/inner.txt").is_ok());
    }
}
