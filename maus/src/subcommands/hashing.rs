//! `maus hash` - hashes one or more files and prints the digest.
//!
//! Grounded on the teacher's `subcommands::hashing::hash_stream`, adapted to a single in-memory
//! hash call instead of a streaming hasher, since [`maus_core::cipher::hash`] operates on a
//! complete buffer rather than chunks.

use anyhow::Result;
use clap::ArgMatches;

use maus_core::primitives::HashId;

use crate::file::{get_bytes, hex_encode};
use crate::global::parameters::get_params;
use crate::global::states::hash_fn;

pub fn execute(sub_matches: &ArgMatches) -> Result<()> {
    let files = get_params("input", sub_matches)?;
    let hash_fn: HashId = hash_fn(sub_matches);

    for file in files {
        match get_bytes(&file) {
            Ok(bytes) => {
                let digest = maus_core::cipher::hash(hash_fn, &bytes);
                paris::success!("{}: {}", file, hex_encode(&digest));
            }
            Err(e) => paris::warn!("Skipping {}: {}", file, e),
        }
    }

    Ok(())
}
