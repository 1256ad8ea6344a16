//! `maus unpack` - unpacks a `.mauz` archive to a directory tree.
//!
//! Grounded on the teacher's `subcommands::unpack`.

use anyhow::Result;
use clap::ArgMatches;

use maus_domain::archive::ArchiveReader;
use maus_domain::storage::FileStorage;
use maus_domain::unpack::{execute, Request, UnresolvedKey};

use crate::file::get_bytes;
use crate::global::parameters::{crypto_params, get_param};
use crate::global::states::{PasswordState, Secret};

pub fn execute_cmd(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;
    let output = get_param("output", sub_matches)?;

    let params = crypto_params(sub_matches);
    let archive_bytes = get_bytes(&input)?;
    let archive = ArchiveReader::open(&archive_bytes).map_err(|e| anyhow::anyhow!("Not a valid mauz archive: {e}"))?;

    let needs_key = archive
        .entries()
        .iter()
        .any(|e| matches!(e, maus_domain::entry::Entry::Unknown(_)));

    let unresolved_key = if needs_key {
        let secret = params.key.secret(&PasswordState::Direct)?;
        Some(match secret {
            Secret::Password(password) => UnresolvedKey::Password(password.expose().clone()),
            Secret::RawKey(raw_key) => UnresolvedKey::RawKey(raw_key.expose().clone()),
        })
    } else {
        None
    };

    let stor = FileStorage;
    let req = Request {
        archive,
        output_dir: std::path::Path::new(&output),
        unresolved_key,
    };

    execute(&stor, req).map_err(|e| anyhow::anyhow!("Unable to unpack {input}: {e}"))?;
    paris::success!("Unpacked {} into {}", input, output);
    Ok(())
}
