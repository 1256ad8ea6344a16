//! `maus decrypt` - decrypts a single `.maus` stream back to plaintext.
//!
//! Grounded on the teacher's `subcommands::decrypt::stream_mode`.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;

use maus_core::stream::StreamReader;

use crate::cli::prompt::overwrite_check;
use crate::file::{get_bytes, write_bytes};
use crate::global::parameters::{crypto_params, get_param};
use crate::global::states::{PasswordState, Secret};

pub fn execute(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;
    let output = get_param("output", sub_matches)?;
    if input == output {
        bail!("Input and output files cannot be the same");
    }

    let params = crypto_params(sub_matches);
    if !overwrite_check(&output, params.force)? {
        return Ok(());
    }

    let stream_bytes = get_bytes(&input)?;
    let mut reader = StreamReader::open(Cursor::new(&stream_bytes)).context("Not a valid maus stream")?;

    if reader.is_encrypted() {
        let secret = params.key.secret(&PasswordState::Direct)?;
        match secret {
            Secret::Password(password) => reader.decrypt_with_password(password)?,
            Secret::RawKey(raw_key) => reader.decrypt_with_key(raw_key)?,
        }
    }

    let decoded = reader.finish().context("Failed to verify or decompress the stream")?;
    write_bytes(&output, &decoded.plaintext)?;
    paris::success!("Decrypted {} into {}", input, output);

    Ok(())
}
