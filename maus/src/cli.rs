//! Defines every clap subcommand and argument. Long and a little repetitive - that's just the
//! nature of the clap builder API, as the teacher's own `cli.rs` says of itself.

pub mod prompt;

use clap::{Arg, Command};

#[allow(clippy::too_many_lines)]
pub fn get_matches() -> clap::ArgMatches {
    let secret_args = [
        Arg::new("keyfile")
            .short('k')
            .long("keyfile")
            .value_name("file")
            .takes_value(true)
            .help("Use a keyfile's raw bytes as the key instead of a password"),
        Arg::new("aes128")
            .long("aes128")
            .takes_value(false)
            .help("Use a 128-bit AES key"),
        Arg::new("aes192")
            .long("aes192")
            .takes_value(false)
            .conflicts_with("aes128")
            .help("Use a 192-bit AES key"),
        Arg::new("sha512")
            .long("sha512")
            .takes_value(false)
            .help("Use SHA-512 instead of SHA-256 for hashing/integrity"),
        Arg::new("sha3-256")
            .long("sha3-256")
            .takes_value(false)
            .conflicts_with("sha512")
            .help("Use SHA3-256 instead of SHA-256 for hashing/integrity"),
        Arg::new("sha3-512")
            .long("sha3-512")
            .takes_value(false)
            .conflicts_with_all(&["sha512", "sha3-256"])
            .help("Use SHA3-512 instead of SHA-256 for hashing/integrity"),
        Arg::new("cycles")
            .long("cycles")
            .value_name("count")
            .takes_value(true)
            .help("Number of PBKDF2 cycles to use when deriving a key from a password (default 100000)"),
        Arg::new("hash")
            .short('H')
            .long("hash")
            .takes_value(false)
            .help("Print a hash of the output file once complete"),
        Arg::new("skip")
            .short('y')
            .long("skip")
            .takes_value(false)
            .help("Skip all prompts"),
    ];

    let encrypt = Command::new("encrypt")
        .short_flag('e')
        .about("Encrypt a file")
        .arg(Arg::new("input").required(true).help("The file to encrypt"))
        .arg(Arg::new("output").required(true).help("The output file"))
        .arg(
            Arg::new("deflate")
                .long("deflate")
                .takes_value(false)
                .help("Compress the file with DEFLATE before encrypting"),
        )
        .arg(
            Arg::new("lzma")
                .long("lzma")
                .takes_value(false)
                .conflicts_with("deflate")
                .help("Compress the file with LZMA before encrypting"),
        )
        .args(&secret_args);

    let decrypt = Command::new("decrypt")
        .short_flag('d')
        .about("Decrypt a file")
        .arg(Arg::new("input").required(true).help("The file to decrypt"))
        .arg(Arg::new("output").required(true).help("The output file"))
        .args(&secret_args);

    let pack = Command::new("pack")
        .short_flag('p')
        .about("Pack (and optionally encrypt) an entire directory into a .mauz archive")
        .arg(Arg::new("input").required(true).help("The directory to pack"))
        .arg(Arg::new("output").required(true).help("The output archive"))
        .arg(
            Arg::new("deflate")
                .long("deflate")
                .takes_value(false)
                .help("Compress each entry with DEFLATE"),
        )
        .arg(
            Arg::new("lzma")
                .long("lzma")
                .takes_value(false)
                .conflicts_with("deflate")
                .help("Compress each entry with LZMA"),
        )
        .arg(
            Arg::new("encrypt")
                .long("encrypt")
                .takes_value(false)
                .help("Encrypt every entry (otherwise the archive is packed in plaintext)"),
        )
        .arg(
            Arg::new("encrypt-filenames")
                .long("encrypt-filenames")
                .takes_value(false)
                .requires("encrypt")
                .help("Also hide filenames behind the per-entry encryption"),
        )
        .args(&secret_args);

    let unpack = Command::new("unpack")
        .short_flag('u')
        .about("Unpack a .mauz archive to a directory")
        .arg(Arg::new("input").required(true).help("The archive to unpack"))
        .arg(Arg::new("output").required(true).help("The destination directory"))
        .args(&secret_args);

    let hash = Command::new("hash").about("Hash one or more files").arg(
        Arg::new("input")
            .required(true)
            .min_values(1)
            .multiple_occurrences(true)
            .help("The file(s) to hash"),
    );

    let header = Command::new("header")
        .about("Manipulate a .maus stream's primary header (for advanced users)")
        .subcommand_required(true)
        .subcommand(
            Command::new("dump")
                .about("Dump a stream's primary header to a separate file")
                .arg(Arg::new("input").required(true).help("The .maus file"))
                .arg(Arg::new("output").required(true).help("Where to write the dumped header"))
                .arg(Arg::new("skip").short('y').long("skip").takes_value(false)),
        )
        .subcommand(
            Command::new("restore")
                .about("Restore a dumped header to the start of a stripped .maus file")
                .arg(Arg::new("input").required(true).help("The dumped header file"))
                .arg(Arg::new("output").required(true).help("The stripped .maus file")),
        )
        .subcommand(
            Command::new("strip")
                .about("Wipe the primary header from a .maus file in place")
                .arg(Arg::new("input").required(true).help("The .maus file")),
        )
        .subcommand(
            Command::new("details")
                .about("Print a .maus file's primary header fields")
                .arg(Arg::new("input").required(true).help("The .maus file")),
        );

    let key = Command::new("key")
        .about("Rotate the password/key protecting a .maus stream")
        .subcommand_required(true)
        .subcommand(
            Command::new("change")
                .about("Decrypt with the old key and re-encrypt with a new one")
                .arg(Arg::new("input").required(true).help("The .maus file"))
                .arg(
                    Arg::new("keyfile-old")
                        .short('k')
                        .long("keyfile-old")
                        .takes_value(true)
                        .help("Use a keyfile's raw bytes as the old key"),
                )
                .arg(
                    Arg::new("keyfile-new")
                        .short('n')
                        .long("keyfile-new")
                        .takes_value(true)
                        .help("Use a keyfile's raw bytes as the new key"),
                ),
        );

    Command::new("maus")
        .version(clap::crate_version!())
        .about("Secure, fast command-line encryption, compression and archiving of files.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(encrypt)
        .subcommand(decrypt)
        .subcommand(pack)
        .subcommand(unpack)
        .subcommand(hash)
        .subcommand(header)
        .subcommand(key)
        .get_matches()
}
