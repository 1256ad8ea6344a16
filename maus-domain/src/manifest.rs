//! The archive manifest: a binding index of `(ordinal, path, integrity)` for every entry
//! (§3 `ArchiveManifest`, §4.2.1 step 3, §6).
//!
//! Wire layout:
//!
//! ```text
//! sigAll: 4 bytes             (0x03 0x53 0x49 0x47, preserved exactly)
//! entry-count: uint64-LE
//! repeated entry-count times:
//!   sigCur: 4 bytes           (0x03 0x73 0x69 0x67)
//!   index: uint64-LE
//!   path-len: 1 byte
//!   path-bytes: UTF-8
//!   integrity-len: 1 byte     (implementation addition: the spec's integrity field doesn't carry
//!                              an explicit length, but entries may use different hash functions,
//!                              so the length needs to travel with the value - see DESIGN.md)
//!   integrity-bytes
//! ```

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use maus_core::primitives::{read_u64, write_u64, MANIFEST_SIG_ALL, MANIFEST_SIG_CUR};

/// One row of the manifest: the entry's ordinal, canonical path, and integrity value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub index: u64,
    pub path: String,
    pub integrity: Vec<u8>,
}

/// The decoded manifest (§3 `ArchiveManifest`).
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    records: Vec<ManifestRecord>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Manifest::default()
    }

    pub fn push(&mut self, index: u64, path: String, integrity: Vec<u8>) -> Result<()> {
        if path.len() > 255 {
            bail!("Manifest path {path:?} exceeds the 255-byte length field");
        }
        if integrity.len() > 255 {
            bail!("Manifest integrity value exceeds the 255-byte length field");
        }
        self.records.push(ManifestRecord {
            index,
            path,
            integrity,
        });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestRecord> {
        self.records.iter()
    }

    /// Returns the record for `index`, if present (§4.2.2 step 2 "reject duplicate indices" is
    /// enforced at parse time, so lookups here are unambiguous).
    #[must_use]
    pub fn get(&self, index: u64) -> Option<&ManifestRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    pub fn serialize(&self, writer: &mut impl Write) -> Result<()> {
        writer
            .write_all(&MANIFEST_SIG_ALL)
            .context("Unable to write manifest sigAll tag")?;
        write_u64(writer, self.records.len() as u64)?;
        for record in &self.records {
            writer
                .write_all(&MANIFEST_SIG_CUR)
                .context("Unable to write manifest sigCur tag")?;
            write_u64(writer, record.index)?;
            writer
                .write_all(&[record.path.len() as u8])
                .context("Unable to write manifest path length")?;
            writer
                .write_all(record.path.as_bytes())
                .context("Unable to write manifest path")?;
            writer
                .write_all(&[record.integrity.len() as u8])
                .context("Unable to write manifest integrity length")?;
            writer
                .write_all(&record.integrity)
                .context("Unable to write manifest integrity value")?;
        }
        Ok(())
    }

    /// Parses the manifest plaintext, rejecting any index appearing more than once (§4.2.2 step
    /// 2).
    pub fn deserialize(reader: &mut impl Read) -> Result<Self> {
        let mut sig_all = [0u8; 4];
        reader
            .read_exact(&mut sig_all)
            .context("Unable to read manifest sigAll tag")?;
        if sig_all != MANIFEST_SIG_ALL {
            bail!("Manifest sigAll tag mismatch");
        }

        let entry_count = read_u64(reader)?;
        let mut records = Vec::with_capacity(entry_count as usize);
        let mut seen_indices = std::collections::HashSet::with_capacity(entry_count as usize);

        for _ in 0..entry_count {
            let mut sig_cur = [0u8; 4];
            reader
                .read_exact(&mut sig_cur)
                .context("Unable to read manifest sigCur tag")?;
            if sig_cur != MANIFEST_SIG_CUR {
                bail!("Manifest sigCur tag mismatch");
            }

            let index = read_u64(reader)?;
            if !seen_indices.insert(index) {
                bail!("Duplicate manifest index {index}");
            }

            let mut path_len = [0u8; 1];
            reader
                .read_exact(&mut path_len)
                .context("Unable to read manifest path length")?;
            let mut path_bytes = vec![0u8; path_len[0] as usize];
            reader
                .read_exact(&mut path_bytes)
                .context("Unable to read manifest path")?;
            let path = String::from_utf8(path_bytes).context("Manifest path is not valid UTF-8")?;

            let mut integrity_len = [0u8; 1];
            reader
                .read_exact(&mut integrity_len)
                .context("Unable to read manifest integrity length")?;
            let mut integrity = vec![0u8; integrity_len[0] as usize];
            reader
                .read_exact(&mut integrity)
                .context("Unable to read manifest integrity value")?;

            records.push(ManifestRecord {
                index,
                path,
                integrity,
            });
        }

        Ok(Manifest { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_two_entries() {
        let mut manifest = Manifest::new();
        manifest.push(0, "a".into(), vec![0xAA; 32]).unwrap();
        manifest.push(1, "b".into(), vec![0xBB; 32]).unwrap();

        let mut buf = Vec::new();
        manifest.serialize(&mut buf).unwrap();
        let mut cur = Cursor::new(buf);
        let decoded = Manifest::deserialize(&mut cur).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get(0).unwrap().path, "a");
        assert_eq!(decoded.get(1).unwrap().integrity, vec![0xBB; 32]);
    }

    #[test]
    fn rejects_duplicate_index() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MANIFEST_SIG_ALL);
        write_u64(&mut buf, 2).unwrap();
        for _ in 0..2 {
            buf.extend_from_slice(&MANIFEST_SIG_CUR);
            write_u64(&mut buf, 0).unwrap(); // both index 0
            buf.push(1);
            buf.push(b'a');
            buf.push(1);
            buf.push(0xFF);
        }
        let mut cur = Cursor::new(buf);
        assert!(Manifest::deserialize(&mut cur).is_err());
    }

    #[test]
    fn rejects_wrong_sig_all_tag() {
        let mut buf = vec![0u8; 4];
        write_u64(&mut buf, 0).unwrap();
        let mut cur = Cursor::new(buf);
        assert!(Manifest::deserialize(&mut cur).is_err());
    }
}
