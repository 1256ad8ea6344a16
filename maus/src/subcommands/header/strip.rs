//! `maus header strip` - zeroes a stream's primary header in place, leaving the rest intact.
//!
//! Grounded on the teacher's `subcommands::header::strip`.

use std::io::Cursor;

use anyhow::Context;
use anyhow::Result;
use clap::ArgMatches;

use maus_core::header::StreamHeader;

use crate::cli::prompt::get_answer;
use crate::file::get_bytes;
use crate::global::parameters::get_param;
use crate::global::states::forcemode;

pub fn execute(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;

    if !get_answer(
        &format!("Stripping the header from {input} is irreversible without a dump - continue?"),
        false,
        forcemode(sub_matches),
    )? {
        return Ok(());
    }

    let mut bytes = get_bytes(&input)?;
    let header = StreamHeader::deserialize(&mut Cursor::new(&bytes))
        .context("Unable to parse the stream's primary header")?;
    let header_len = header.to_bytes().context("Unable to re-serialize the header")?.len();

    bytes[..header_len].fill(0);
    std::fs::write(&input, &bytes).with_context(|| format!("Unable to write {input}"))?;

    paris::success!("Stripped the header from {}", input);
    Ok(())
}
