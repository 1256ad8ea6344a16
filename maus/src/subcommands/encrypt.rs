//! `maus encrypt` - encrypts a single file into a `.maus` stream.
//!
//! Grounded on the teacher's `subcommands::encrypt::stream_mode`.

use anyhow::{bail, Context, Result};
use clap::ArgMatches;

use maus_core::primitives::FormatVersion;
use maus_core::stream::{EncryptionParams, StreamWriter, WriteConfig};

use crate::cli::prompt::overwrite_check;
use crate::file::{get_bytes, hex_encode, write_bytes};
use crate::global::parameters::{crypto_params, get_param};
use crate::global::states::{compression, HashMode, PasswordState, Secret};

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

    let plaintext = get_bytes(&input)?;
    let secret = params.key.secret(&PasswordState::Validate)?;

    let mut config = WriteConfig::new(FormatVersion::V93, compression(sub_matches), params.hash_fn);
    config.filename = Some(input.clone());
    config.encryption = Some(match secret {
        Secret::Password(password) => EncryptionParams {
            key_bits: params.key_bits,
            password: Some(password),
            raw_key: None,
            pbkdf2_user_cycles: params.pbkdf2_cycles,
            wrap_public_key: None,
        },
        Secret::RawKey(raw_key) => EncryptionParams {
            key_bits: params.key_bits,
            password: None,
            raw_key: Some(raw_key),
            pbkdf2_user_cycles: params.pbkdf2_cycles,
            wrap_public_key: None,
        },
    });

    let mut writer = StreamWriter::new(config);
    writer.push(&plaintext).context("Unable to buffer plaintext")?;
    let stream_bytes = writer.finish().context("Unable to finalize the encrypted stream")?;

    write_bytes(&output, &stream_bytes)?;
    paris::success!("Encrypted {} into {}", input, output);

    if params.hash_mode == HashMode::CalculateHash {
        let digest = maus_core::cipher::hash(params.hash_fn, &stream_bytes);
        paris::info!("Hash of {}: {}", output, hex_encode(&digest));
    }

    Ok(())
}
