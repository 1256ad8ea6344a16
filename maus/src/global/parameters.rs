//! Pulls typed values out of clap's `ArgMatches`.
//!
//! Grounded on the teacher's `global::parameters`.

use anyhow::{Context, Result};
use clap::ArgMatches;

use super::states::{compression, forcemode, hash_fn, key_bits, pbkdf2_cycles, HashMode, Key};
use super::structs::{CryptoParams, PackParams};

pub fn get_param(name: &str, sub_matches: &ArgMatches) -> Result<String> {
    sub_matches
        .value_of(name)
        .with_context(|| format!("No {name} provided"))
        .map(ToString::to_string)
}

pub fn get_params(name: &str, sub_matches: &ArgMatches) -> Result<Vec<String>> {
    Ok(sub_matches
        .get_many::<String>(name)
        .with_context(|| format!("No {name} provided"))?
        .map(String::from)
        .collect())
}

/// The main parameter handler for encrypt/decrypt/pack/unpack.
pub fn crypto_params(sub_matches: &ArgMatches) -> CryptoParams {
    let hash_mode = if sub_matches.is_present("hash") {
        HashMode::CalculateHash
    } else {
        HashMode::NoHash
    };

    CryptoParams {
        key: Key::init(sub_matches, "keyfile"),
        key_bits: key_bits(sub_matches),
        hash_fn: hash_fn(sub_matches),
        pbkdf2_cycles: pbkdf2_cycles(sub_matches).unwrap_or_else(|e| {
            paris::warn!("{e} - using the default.");
            100_000
        }),
        hash_mode,
        force: forcemode(sub_matches),
    }
}

pub fn pack_params(sub_matches: &ArgMatches) -> PackParams {
    PackParams {
        compression: compression(sub_matches),
        encrypt_filenames: sub_matches.is_present("encrypt-filenames"),
    }
}
