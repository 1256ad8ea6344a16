//! Toggles and small enums threaded through the subcommand functions, so each one can be
//! constructed from `ArgMatches` without passing a dozen loose booleans around.
//!
//! Grounded on the teacher's `global::states`, trimmed to the choices this format actually has:
//! one key slot per stream (no keyslot array), so there's no `EraseMode`/erase-on-complete here
//! either - `maus-domain` doesn't shred source files the way `dexios-domain::erase` does.

use anyhow::{Context, Result};
use clap::ArgMatches;

use maus_core::cipher::KeyBits;
use maus_core::primitives::{CompressionId, HashId};
use maus_core::protected::Protected;

use crate::cli::prompt::get_password;

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum ForceMode {
    Force,
    Prompt,
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum HashMode {
    CalculateHash,
    NoHash,
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum PrintMode {
    Verbose,
    Quiet,
}

#[derive(PartialEq, Eq)]
pub enum PasswordState {
    Validate,
    Direct,
}

/// Where the key for an encrypt/decrypt/pack/unpack operation comes from.
pub enum Key {
    Keyfile(String),
    Env,
    User,
}

fn get_bytes(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Unable to read keyfile: {path}"))
}

impl Key {
    /// Per the teacher's `Key::init`: keyfile (if given) wins, then the `MAUS_KEY` environment
    /// variable, then an interactive password prompt.
    pub fn init(sub_matches: &ArgMatches, keyfile_descriptor: &str) -> Self {
        if sub_matches.is_present(keyfile_descriptor) {
            Key::Keyfile(
                sub_matches
                    .value_of(keyfile_descriptor)
                    .expect("presence already checked")
                    .to_string(),
            )
        } else if std::env::var("MAUS_KEY").is_ok() {
            Key::Env
        } else {
            Key::User
        }
    }

    /// Resolves this key source into the secret to actually use: raw bytes for a keyfile/env
    /// source, or an interactively-entered password (PBKDF2-derived later) for `Key::User`.
    pub fn secret(&self, pass_state: &PasswordState) -> Result<Secret> {
        let secret = match self {
            Key::Keyfile(path) => {
                let bytes = get_bytes(path)?;
                if bytes.is_empty() {
                    return Err(anyhow::anyhow!("Keyfile '{path}' is empty"));
                }
                Secret::RawKey(Protected::new(bytes))
            }
            Key::Env => {
                let bytes = std::env::var("MAUS_KEY")
                    .context("Unable to read MAUS_KEY from the environment")?
                    .into_bytes();
                if bytes.is_empty() {
                    return Err(anyhow::anyhow!("MAUS_KEY is empty"));
                }
                Secret::RawKey(Protected::new(bytes))
            }
            Key::User => {
                let password = get_password(pass_state)?;
                if password.expose().is_empty() {
                    return Err(anyhow::anyhow!("The specified password is empty"));
                }
                Secret::Password(password)
            }
        };
        Ok(secret)
    }
}

/// The resolved secret for a single encrypt/decrypt operation: either a password to run through
/// PBKDF2, or key bytes to use directly.
pub enum Secret {
    Password(Protected<Vec<u8>>),
    RawKey(Protected<Vec<u8>>),
}

pub fn forcemode(sub_matches: &ArgMatches) -> ForceMode {
    if sub_matches.is_present("skip") {
        ForceMode::Force
    } else {
        ForceMode::Prompt
    }
}

pub fn key_bits(sub_matches: &ArgMatches) -> KeyBits {
    if sub_matches.is_present("aes128") {
        KeyBits::Aes128
    } else if sub_matches.is_present("aes192") {
        KeyBits::Aes192
    } else {
        KeyBits::Aes256
    }
}

pub fn hash_fn(sub_matches: &ArgMatches) -> HashId {
    if sub_matches.is_present("sha512") {
        HashId::Sha512
    } else if sub_matches.is_present("sha3-256") {
        HashId::Sha3_256
    } else if sub_matches.is_present("sha3-512") {
        HashId::Sha3_512
    } else {
        HashId::Sha256
    }
}

pub fn compression(sub_matches: &ArgMatches) -> CompressionId {
    if sub_matches.is_present("lzma") {
        CompressionId::Lzma
    } else if sub_matches.is_present("deflate") {
        CompressionId::Deflate
    } else {
        CompressionId::None
    }
}

pub fn pbkdf2_cycles(sub_matches: &ArgMatches) -> Result<u32> {
    if sub_matches.is_present("cycles") {
        sub_matches
            .value_of("cycles")
            .context("No cycle count provided")?
            .parse()
            .context("Cycle count must be a positive integer")
    } else {
        Ok(100_000)
    }
}
