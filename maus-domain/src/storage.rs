//! Filesystem access abstracted behind a trait, so [`crate::pack`]/[`crate::unpack`] can be
//! exercised against an in-memory double instead of real files (§5 "packing/unpacking a
//! directory tree").
//!
//! Grounded on `dexios-domain::storage::Storage`, simplified: `StreamWriter`/`StreamReader` work
//! over complete in-memory buffers rather than generic `Read + Write + Seek` streams, so there's
//! no need for the teacher's `RW` type parameter or its `Entry<RW>` handle - this trait just
//! moves whole files and directory listings as plain values.

use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    CreateDir,
    CreateFile,
    ReadFile,
    WriteFile,
    RemoveFile,
    RemoveDir,
    DirEntries,
    FileAccess,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CreateDir => f.write_str("Unable to create a new directory"),
            Error::CreateFile => f.write_str("Unable to create a new file"),
            Error::ReadFile => f.write_str("Unable to read the file"),
            Error::WriteFile => f.write_str("Unable to write the file"),
            Error::RemoveFile => f.write_str("Unable to remove the file"),
            Error::RemoveDir => f.write_str("Unable to remove the directory"),
            Error::DirEntries => f.write_str("Unable to read directory entries"),
            Error::FileAccess => f.write_str("Permission denied"),
        }
    }
}

impl std::error::Error for Error {}

/// One entry discovered while walking a directory tree: either a regular file or an empty
/// directory (a non-empty directory is implied by the files found underneath it and needs no
/// entry of its own - §4.1.4 is only for directories with nothing inside).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkedEntry {
    File(PathBuf),
    EmptyDirectory(PathBuf),
}

pub trait Storage: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> Result<(), Error>;
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, Error>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), Error>;
    fn remove_file(&self, path: &Path) -> Result<(), Error>;
    fn remove_dir_all(&self, path: &Path) -> Result<(), Error>;
    /// Walks `root`, returning every regular file and every empty directory beneath it, relative
    /// paths kept relative to `root`.
    fn walk(&self, root: &Path) -> Result<Vec<WalkedEntry>, Error>;
}

pub struct FileStorage;

impl Storage for FileStorage {
    fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(path).map_err(|_| Error::CreateDir)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, Error> {
        std::fs::read(path).map_err(|_| Error::ReadFile)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| Error::CreateFile)?;
        }
        std::fs::write(path, contents).map_err(|_| Error::WriteFile)
    }

    fn remove_file(&self, path: &Path) -> Result<(), Error> {
        std::fs::remove_file(path).map_err(|_| Error::RemoveFile)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), Error> {
        std::fs::remove_dir_all(path).map_err(|_| Error::RemoveDir)
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkedEntry>, Error> {
        let mut entries = Vec::new();
        for result in walkdir::WalkDir::new(root) {
            let dir_entry = result.map_err(|_| Error::DirEntries)?;
            let path = dir_entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            if relative.as_os_str().is_empty() {
                continue;
            }
            if dir_entry.file_type().is_dir() {
                let is_empty = std::fs::read_dir(path)
                    .map_err(|_| Error::DirEntries)?
                    .next()
                    .is_none();
                if is_empty {
                    entries.push(WalkedEntry::EmptyDirectory(relative));
                }
            } else if dir_entry.file_type().is_file() {
                entries.push(WalkedEntry::File(relative));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
pub struct InMemoryStorage {
    files: std::sync::RwLock<std::collections::HashMap<PathBuf, Vec<u8>>>,
    dirs: std::sync::RwLock<std::collections::HashSet<PathBuf>>,
}

#[cfg(test)]
impl Default for InMemoryStorage {
    fn default() -> Self {
        InMemoryStorage {
            files: std::sync::RwLock::new(std::collections::HashMap::new()),
            dirs: std::sync::RwLock::new(std::collections::HashSet::new()),
        }
    }
}

#[cfg(test)]
impl InMemoryStorage {
    pub fn put_file(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.write().unwrap().insert(path.into(), contents.into());
    }

    pub fn put_empty_dir(&self, path: impl Into<PathBuf>) {
        self.dirs.write().unwrap().insert(path.into());
    }

    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).cloned()
    }
}

#[cfg(test)]
impl Storage for InMemoryStorage {
    fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
        self.dirs.write().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, Error> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(Error::ReadFile)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), Error> {
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), Error> {
        self.files
            .write()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or(Error::RemoveFile)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), Error> {
        self.dirs.write().unwrap().retain(|d| !d.starts_with(path));
        self.files.write().unwrap().retain(|f, _| !f.starts_with(path));
        Ok(())
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkedEntry>, Error> {
        let strip = |p: &Path| p.strip_prefix(root).unwrap_or(p).to_path_buf();
        let mut entries: Vec<WalkedEntry> = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|p| p.starts_with(root))
            .map(|p| WalkedEntry::File(strip(p)))
            .collect();
        entries.extend(
            self.dirs
                .read()
                .unwrap()
                .iter()
                .filter(|p| p.starts_with(root))
                .map(|p| WalkedEntry::EmptyDirectory(strip(p))),
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_roundtrip() {
        let storage = InMemoryStorage::default();
        storage.write_file(Path::new("a.txt"), b"hello").unwrap();
        assert_eq!(storage.read_file(Path::new("a.txt")).unwrap(), b"hello");
    }

    #[test]
    fn in_memory_walk_finds_files_and_empty_dirs() {
        let storage = InMemoryStorage::default();
        storage.put_file("root/a.txt", b"A".to_vec());
        storage.put_file("root/sub/b.txt", b"B".to_vec());
        storage.put_empty_dir("root/empty");

        let mut entries = storage.walk(Path::new("root")).unwrap();
        entries.sort_by_key(|e| match e {
            WalkedEntry::File(p) | WalkedEntry::EmptyDirectory(p) => p.clone(),
        });

        assert_eq!(entries.len(), 3);
        assert!(entries.contains(&WalkedEntry::File(PathBuf::from("a.txt"))));
        assert!(entries.contains(&WalkedEntry::EmptyDirectory(PathBuf::from("empty"))));
    }

    #[test]
    fn remove_file_errors_when_absent() {
        let storage = InMemoryStorage::default();
        assert!(matches!(
            storage.remove_file(Path::new("missing.txt")),
            Err(Error::RemoveFile)
        ));
    }
}
