//! Bundled parameter structs, so subcommand functions take one value instead of half a dozen.
//!
//! Grounded on the teacher's `global::structs::CryptoParams`.

use maus_core::cipher::KeyBits;
use maus_core::primitives::{CompressionId, HashId};

use super::states::{ForceMode, HashMode, Key};

pub struct CryptoParams {
    pub key: Key,
    pub key_bits: KeyBits,
    pub hash_fn: HashId,
    pub pbkdf2_cycles: u32,
    pub hash_mode: HashMode,
    pub force: ForceMode,
}

pub struct PackParams {
    pub compression: CompressionId,
    pub encrypt_filenames: bool,
}
