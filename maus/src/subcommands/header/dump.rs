//! `maus header dump` - writes a stream's primary header to a separate file.
//!
//! Grounded on the teacher's `cmd::header::dump`.

use std::io::Cursor;

use anyhow::{Context, Result};
use clap::ArgMatches;

use maus_core::header::StreamHeader;

use crate::cli::prompt::overwrite_check;
use crate::file::{get_bytes, write_bytes};
use crate::global::parameters::get_param;
use crate::global::states::forcemode;

pub fn execute(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;
    let output = get_param("output", sub_matches)?;

    if !overwrite_check(&output, forcemode(sub_matches))? {
        return Ok(());
    }

    let stream_bytes = get_bytes(&input)?;
    let header = StreamHeader::deserialize(&mut Cursor::new(&stream_bytes))
        .context("Unable to parse the stream's primary header")?;
    let header_bytes = header.to_bytes().context("Unable to re-serialize the header")?;

    write_bytes(&output, &header_bytes)?;
    paris::success!("Dumped the header of {} into {}", input, output);
    Ok(())
}
