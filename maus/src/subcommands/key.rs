//! `maus key change` - decrypts a stream with its current secret and re-encrypts it with a new
//! one, in place.
//!
//! The teacher's `key` subcommand also has `add`/`del`, which operate on a keyslot array
//! (`HeaderVersion::V4`/`V5` in `dexios-core::header`). This format's primary header carries
//! exactly one salt/IV/wrapped-key set per stream, so there is no keyslot to add or remove -
//! only `change` has a real counterpart here.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;

use maus_core::header::StreamHeader;
use maus_core::protected::Protected;
use maus_core::stream::{EncryptionParams, StreamReader, StreamWriter, WriteConfig};

use crate::cli::prompt::get_password;
use crate::file::get_bytes;
use crate::global::parameters::get_param;
use crate::global::states::{compression, hash_fn, key_bits, pbkdf2_cycles, PasswordState};

pub fn change(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;

    let stream_bytes = get_bytes(&input)?;
    let header = StreamHeader::deserialize(&mut Cursor::new(&stream_bytes))
        .context("Unable to parse the stream's primary header")?;

    let mut reader = StreamReader::open(Cursor::new(&stream_bytes)).context("Not a valid maus stream")?;
    if !reader.is_encrypted() {
        bail!("{input} is not encrypted, there is no key to change");
    }

    if let Some(path) = sub_matches.value_of("keyfile-old") {
        reader.decrypt_with_key(Protected::new(get_bytes(path)?))?;
    } else {
        reader.decrypt_with_password(get_password(&PasswordState::Direct)?)?;
    }
    let decoded = reader.finish().context("Failed to verify or decompress the stream")?;

    let mut config = WriteConfig::new(header.version, compression(sub_matches), hash_fn(sub_matches));
    config.filename = decoded.filename.clone();
    config.created_time = decoded.created_time;
    config.modified_time = decoded.modified_time;
    config.comment = decoded.comment.clone();
    config.user_options = decoded.user_options.clone();

    let pbkdf2_user_cycles = pbkdf2_cycles(sub_matches).unwrap_or_else(|e| {
        paris::warn!("{e} - using the default.");
        100_000
    });

    config.encryption = Some(if let Some(path) = sub_matches.value_of("keyfile-new") {
        EncryptionParams {
            key_bits: key_bits(sub_matches),
            password: None,
            raw_key: Some(Protected::new(get_bytes(path)?)),
            pbkdf2_user_cycles,
            wrap_public_key: None,
        }
    } else {
        EncryptionParams {
            key_bits: key_bits(sub_matches),
            password: Some(get_password(&PasswordState::Validate)?),
            raw_key: None,
            pbkdf2_user_cycles,
            wrap_public_key: None,
        }
    });

    let mut writer = StreamWriter::new(config);
    writer.push(&decoded.plaintext).context("Unable to buffer plaintext")?;
    let new_stream_bytes = writer.finish().context("Unable to finalize the re-encrypted stream")?;

    std::fs::write(&input, &new_stream_bytes).with_context(|| format!("Unable to write {input}"))?;
    paris::success!("Changed the key protecting {}", input);
    Ok(())
}
