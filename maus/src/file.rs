//! Small filesystem helpers shared by the subcommand modules.
//!
//! Grounded on the teacher's `file.rs`, trimmed to what this CLI actually needs - there's no
//! directory-walk helper here because `maus-domain::storage::FileStorage` already walks a tree
//! for `pack`/`unpack`.

use anyhow::{Context, Result};

pub fn get_bytes(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Unable to read {path}"))
}

pub fn write_bytes(path: &str, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Unable to write {path}"))
}

#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
