//! `maus-core` implements the `.maus` single-entry stream format: wire primitives, the typed
//! option list, the buffered payload chain, key derivation, AES-CBC + HMAC, asymmetric signing,
//! streaming compression, and the `StreamCodec` state machine that composes them.
//!
//! Archive (`.mauz`) framing lives in the `maus-domain` crate, which is built on top of this one.

pub mod cipher;
pub mod compression;
pub mod error;
pub mod header;
pub mod key;
pub mod options;
pub mod payload;
pub mod primitives;
pub mod progress;
pub mod protected;
pub mod signature;
pub mod stream;

pub use error::{Error, Result};
