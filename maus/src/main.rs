//! `maus`: a command-line tool for encrypting, compressing and archiving files with the maus
//! stream/archive formats.
//!
//! Grounded on the teacher's `main.rs` - a flat match over the top-level subcommand name, with
//! each branch delegating to a function in [`subcommands`].

mod cli;
mod file;
mod global;
mod subcommands;

fn main() {
    let matches = cli::get_matches();

    let result = match matches.subcommand() {
        Some(("encrypt", sub_matches)) => subcommands::encrypt::execute(sub_matches),
        Some(("decrypt", sub_matches)) => subcommands::decrypt::execute(sub_matches),
        Some(("pack", sub_matches)) => subcommands::pack::execute_cmd(sub_matches),
        Some(("unpack", sub_matches)) => subcommands::unpack::execute_cmd(sub_matches),
        Some(("hash", sub_matches)) => subcommands::hashing::execute(sub_matches),
        Some(("header", sub_matches)) => match sub_matches.subcommand() {
            Some(("dump", m)) => subcommands::header::dump::execute(m),
            Some(("restore", m)) => subcommands::header::restore::execute(m),
            Some(("strip", m)) => subcommands::header::strip::execute(m),
            Some(("details", m)) => subcommands::header::details::execute(m),
            _ => unreachable!("clap enforces a header subcommand"),
        },
        Some(("key", sub_matches)) => match sub_matches.subcommand() {
            Some(("change", m)) => subcommands::key::change(m),
            _ => unreachable!("clap enforces a key subcommand"),
        },
        _ => unreachable!("clap enforces a top-level subcommand"),
    };

    if let Err(e) = result {
        paris::error!("{e:?}");
        std::process::exit(1);
    }
}
