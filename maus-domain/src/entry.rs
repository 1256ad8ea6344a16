//! Archive entry variants (§9 "inheritance of entry types").
//!
//! Grounded on the teacher's `storage::Entry<RW>` tagged-variant shape (`File`/`Dir`), extended
//! with the third variant this format actually needs: an encrypted entry whose path isn't known
//! until it's decrypted (§4.2.3).

use maus_core::options::OptionList;
use maus_core::stream::{DecodedEntry, SignatureRecord, StreamReader};
use maus_core::{Error, Result};

/// A fully decoded file entry.
pub struct FileEntry {
    pub index: u64,
    pub path: String,
    pub plaintext: Vec<u8>,
    pub created_time: Option<i64>,
    pub modified_time: Option<i64>,
    pub comment: Option<String>,
    pub user_options: OptionList,
    pub signed_preimage: Vec<u8>,
    pub signatures: Vec<SignatureRecord>,
}

/// A fully decoded empty-directory entry (§4.1.4).
pub struct EmptyDirectoryEntry {
    pub index: u64,
    pub path: String,
}

/// An encrypted entry whose filename was itself encrypted: not resolvable until [`decrypt`] is
/// called (§4.2.3).
///
/// [`decrypt`]: UnknownEntry::decrypt_with_password
pub struct UnknownEntry {
    pub index: u64,
    pub(crate) integrity: Vec<u8>,
    reader: StreamReader,
}

impl UnknownEntry {
    pub(crate) fn new(index: u64, integrity: Vec<u8>, reader: StreamReader) -> Self {
        UnknownEntry {
            index,
            integrity,
            reader,
        }
    }

    /// The path, if it happens to be known from the primary header even though the entry is
    /// encrypted (§4.1.3 edge case: filenames may be present in the primary list regardless of
    /// encryption).
    #[must_use]
    pub fn known_path(&self) -> Option<String> {
        self.reader.header().filename().ok().flatten()
    }

    /// Resolves the placeholder by deriving a key from `password`, decrypting, and classifying
    /// the result as a file or an empty directory based on the decrypted path's trailing `/`
    /// (§4.2.3).
    pub fn decrypt_with_password(
        mut self,
        password: maus_core::protected::Protected<Vec<u8>>,
    ) -> Result<Entry> {
        self.reader.decrypt_with_password(password)?;
        self.finish_decrypt()
    }

    /// As [`decrypt_with_password`], but with a caller-supplied raw key.
    ///
    /// [`decrypt_with_password`]: UnknownEntry::decrypt_with_password
    pub fn decrypt_with_key(
        mut self,
        raw_key: maus_core::protected::Protected<Vec<u8>>,
    ) -> Result<Entry> {
        self.reader.decrypt_with_key(raw_key)?;
        self.finish_decrypt()
    }

    fn finish_decrypt(self) -> Result<Entry> {
        let index = self.index;
        let decoded: DecodedEntry = self.reader.finish()?;
        let path = decoded
            .filename
            .clone()
            .ok_or_else(|| Error::InvalidFormat("decrypted entry has no path".into()))?;

        if path.ends_with('/') {
            maus_core::stream::validate_empty_directory(&decoded)?;
            Ok(Entry::EmptyDirectory(EmptyDirectoryEntry { index, path }))
        } else {
            Ok(Entry::File(FileEntry {
                index,
                path,
                plaintext: decoded.plaintext,
                created_time: decoded.created_time,
                modified_time: decoded.modified_time,
                comment: decoded.comment,
                user_options: decoded.user_options,
                signed_preimage: decoded.signed_preimage,
                signatures: decoded.signatures,
            }))
        }
    }
}

/// One entry in an archive's ordered entry list.
pub enum Entry {
    File(FileEntry),
    EmptyDirectory(EmptyDirectoryEntry),
    Unknown(UnknownEntry),
}

impl Entry {
    #[must_use]
    pub fn index(&self) -> u64 {
        match self {
            Entry::File(e) => e.index,
            Entry::EmptyDirectory(e) => e.index,
            Entry::Unknown(e) => e.index,
        }
    }

    /// The entry's path, when known without decrypting.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        match self {
            Entry::File(e) => Some(e.path.clone()),
            Entry::EmptyDirectory(e) => Some(e.path.clone()),
            Entry::Unknown(e) => e.known_path(),
        }
    }
}
