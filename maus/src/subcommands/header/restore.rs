//! `maus header restore` - writes a previously dumped header back over a stripped stream.
//!
//! Grounded on the teacher's `subcommands::header::restore`.

use anyhow::{bail, Context, Result};
use clap::ArgMatches;

use crate::file::get_bytes;
use crate::global::parameters::get_param;

pub fn execute(sub_matches: &ArgMatches) -> Result<()> {
    let input = get_param("input", sub_matches)?;
    let output = get_param("output", sub_matches)?;

    let header_bytes = get_bytes(&input)?;
    let mut target = get_bytes(&output)?;

    if target.len() < header_bytes.len() {
        bail!("{output} is shorter than the dumped header, refusing to restore");
    }

    target[..header_bytes.len()].copy_from_slice(&header_bytes);
    std::fs::write(&output, &target).with_context(|| format!("Unable to write {output}"))?;

    paris::success!("Restored the header from {} into {}", input, output);
    Ok(())
}
