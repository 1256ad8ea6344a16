//! The typed error surface returned by [`crate::stream::StreamCodec`] and consumed by
//! `maus-domain`'s `ArchiveFramer`.
//!
//! Lower-level helpers (`primitives`, `options`, `header`) use `anyhow::Result` internally for
//! quick `.context()` propagation, the same way `dexios-core` does; this module is where those
//! errors get collapsed into the seven closed kinds the format actually distinguishes (spec §7).

/// The error kinds a `StreamCodec`/`ArchiveFramer` operation can fail with.
#[derive(Debug)]
pub enum Error {
    /// Wire bytes violate the format: bad magic, bad version, a field out of range, a duplicate
    /// manifest index.
    InvalidFormat(String),
    /// A recognized-but-unsupported compression/encryption/hash/signature algorithm id.
    UnsupportedFeature(String),
    /// HMAC or hash mismatch - also the result of a wrong password/key. Retryable: the caller may
    /// set a new key and re-invoke decrypt.
    IntegrityFailure,
    /// A signature was present but did not verify. Non-fatal; callers decide whether to treat it
    /// as an error.
    SignatureUnverified,
    /// An option-list or option-value length would overflow its wire field, or an archive has too
    /// many entries.
    CapacityExceeded(String),
    /// The operation is not permitted in the codec's/framer's current state.
    InvalidState(&'static str),
    /// Archive insertion found a path already present.
    DuplicatePath(String),
    /// The underlying reader/writer failed.
    Io(std::io::Error),
}

impl Error {
    /// Per §7: `IntegrityFailure` is the one kind that's explicitly retryable (set a new key and
    /// re-invoke decrypt). Every other kind leaves the codec in `Failed`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::IntegrityFailure)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidFormat(msg) => write!(f, "Invalid format: {msg}"),
            Error::UnsupportedFeature(msg) => write!(f, "Unsupported feature: {msg}"),
            Error::IntegrityFailure => f.write_str(
                "Integrity check failed (wrong key/password, or the data has been tampered with)",
            ),
            Error::SignatureUnverified => f.write_str("Signature present but did not verify"),
            Error::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {msg}"),
            Error::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            Error::DuplicatePath(path) => write!(f, "Duplicate path in archive: {path}"),
            Error::Io(inner) => write!(f, "I/O error: {inner}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

/// Collapses an `anyhow::Error` produced by one of the leaf wire helpers into `InvalidFormat`.
///
/// This is also exposed as `impl From<anyhow::Error>` so `maus-domain` can cross the same
/// boundary when it parses archive-level framing with the same `primitives`/`options` helpers.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::InvalidFormat(err.to_string())
    }
}

pub(crate) fn invalid_format(err: anyhow::Error) -> Error {
    Error::from(err)
}

pub type Result<T> = std::result::Result<T, Error>;
