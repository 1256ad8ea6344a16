//! `maus pack` - packs a directory tree into a `.mauz` archive.
//!
//! Grounded on the teacher's `subcommands::pack`, adapted to hand a whole directory to
//! `maus_domain::pack::execute` instead of building a zip file entry by entry.

use anyhow::Result;
use clap::ArgMatches;

use maus_core::primitives::FormatVersion;

use maus_domain::pack::{execute, PackEncryption, Request};
use maus_domain::storage::FileStorage;

use crate::cli::prompt::overwrite_check;
use crate::file::write_bytes;
use crate::global::parameters::{crypto_params, get_param, pack_params};
use crate::global::states::{PasswordState, Secret};

pub fn execute_cmd(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;
    let output = get_param("output", sub_matches)?;

    let params = crypto_params(sub_matches);
    let pack = pack_params(sub_matches);
    if !overwrite_check(&output, params.force)? {
        return Ok(());
    }

    let encryption = if sub_matches.is_present("encrypt") {
        let secret = params.key.secret(&PasswordState::Validate)?;
        let (password, raw_key) = match secret {
            Secret::Password(password) => (Some(password.expose().clone()), None),
            Secret::RawKey(raw_key) => (None, Some(raw_key.expose().clone())),
        };
        Some(PackEncryption {
            key_bits: params.key_bits,
            password,
            raw_key,
            pbkdf2_user_cycles: params.pbkdf2_cycles,
            encrypt_filenames: pack.encrypt_filenames,
        })
    } else {
        None
    };

    let stor = FileStorage;
    let req = Request {
        root: std::path::Path::new(&input),
        version: FormatVersion::V93,
        compression: pack.compression,
        hash_fn: params.hash_fn,
        encryption,
        entry_signing: Vec::new(),
        archive_signing: Vec::new(),
    };

    let archive_bytes = execute(&stor, req).map_err(|e| anyhow::anyhow!("Unable to pack {input}: {e}"))?;
    write_bytes(&output, &archive_bytes)?;
    paris::success!("Packed {} into {}", input, output);
    Ok(())
}
