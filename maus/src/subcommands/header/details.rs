//! `maus header details` - prints a stream's primary header fields.
//!
//! Grounded on the teacher's `subcommands::header::details`.

use std::io::Cursor;

use anyhow::{Context, Result};
use clap::ArgMatches;

use maus_core::header::StreamHeader;

use crate::file::{get_bytes, hex_encode};
use crate::global::parameters::get_param;

pub fn execute(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;
    let stream_bytes = get_bytes(&input)?;
    let header = StreamHeader::deserialize(&mut Cursor::new(&stream_bytes))
        .context("Unable to parse the stream's primary header")?;

    paris::info!("Version: {:?}", header.version);
    paris::info!("Compression: {:?}", header.compression);
    paris::info!("Encryption: {:?}", header.encryption);
    paris::info!("Hash function: {:?}", header.hash_fn);

    if let Some(salt) = header.salt() {
        paris::info!("Salt: {}", hex_encode(salt));
    }
    if let Some(iv) = header.iv() {
        paris::info!("IV: {}", hex_encode(iv));
    }
    if let Some(iterations) = header.pbkdf2_wire_iterations().context("Malformed PBKDF2 iteration option")? {
        paris::info!("PBKDF2 iterations (wire value): {}", iterations);
    }
    if let Some(wrapped) = header.wrapped_key() {
        paris::info!("Wrapped key: {}", hex_encode(wrapped));
    }
    if let Some(filename) = header.filename().context("Malformed filename option")? {
        paris::info!("Filename: {}", filename);
    } else {
        paris::info!("Filename: <hidden or absent>");
    }

    Ok(())
}
