//! Streaming compression transforms (§4.1.2 step 3, §6).
//!
//! `dexios-core` has no compression layer of its own - compression there is handled by a whole
//! separate zip entry, not a stream transform - so this is grounded on how `flate2`'s and `xz2`'s
//! own `Write` adapters are meant to be driven: feed bytes in with repeated `write_all`, call
//! `finish` once at the end to flush the transform's internal state and recover the underlying
//! writer.

use std::io::Write;

use anyhow::{Context, Result};
use flate2::write::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use xz2::write::{XzDecoder, XzEncoder};

use crate::primitives::CompressionId;

/// A one-shot, in-memory streaming compressor. Bytes pushed via [`push`] are compressed
/// immediately; [`finish`] flushes and returns the complete compressed output.
///
/// [`push`]: CompressorSink::push
/// [`finish`]: CompressorSink::finish
pub enum CompressorSink {
    None(Vec<u8>),
    Deflate(DeflateEncoder<Vec<u8>>),
    Lzma(XzEncoder<Vec<u8>>),
}

impl CompressorSink {
    #[must_use]
    pub fn new(id: CompressionId) -> Self {
        match id {
            CompressionId::None => CompressorSink::None(Vec::new()),
            CompressionId::Deflate => {
                CompressorSink::Deflate(DeflateEncoder::new(Vec::new(), Compression::default()))
            }
            CompressionId::Lzma => CompressorSink::Lzma(XzEncoder::new(Vec::new(), 6)),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            CompressorSink::None(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            CompressorSink::Deflate(enc) => enc.write_all(bytes).context("Deflate write failed"),
            CompressorSink::Lzma(enc) => enc.write_all(bytes).context("LZMA write failed"),
        }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        match self {
            CompressorSink::None(buf) => Ok(buf),
            CompressorSink::Deflate(enc) => enc.finish().context("Deflate finish failed"),
            CompressorSink::Lzma(enc) => enc.finish().context("LZMA finish failed"),
        }
    }
}

/// The inverse of [`CompressorSink`]: pushes compressed bytes in, recovers the original plaintext
/// on [`finish`].
///
/// [`finish`]: DecompressorSink::finish
pub enum DecompressorSink {
    None(Vec<u8>),
    Deflate(DeflateDecoder<Vec<u8>>),
    Lzma(XzDecoder<Vec<u8>>),
}

impl DecompressorSink {
    #[must_use]
    pub fn new(id: CompressionId) -> Self {
        match id {
            CompressionId::None => DecompressorSink::None(Vec::new()),
            CompressionId::Deflate => DecompressorSink::Deflate(DeflateDecoder::new(Vec::new())),
            CompressionId::Lzma => DecompressorSink::Lzma(XzDecoder::new(Vec::new())),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            DecompressorSink::None(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            DecompressorSink::Deflate(dec) => {
                dec.write_all(bytes).context("Deflate decompression failed, data may be corrupt")
            }
            DecompressorSink::Lzma(dec) => {
                dec.write_all(bytes).context("LZMA decompression failed, data may be corrupt")
            }
        }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        match self {
            DecompressorSink::None(buf) => Ok(buf),
            DecompressorSink::Deflate(dec) => {
                dec.finish().context("Deflate decompression did not terminate cleanly")
            }
            DecompressorSink::Lzma(dec) => {
                dec.finish().context("LZMA decompression did not terminate cleanly")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(id: CompressionId) {
        let plaintext = b"the quick brown fox jumps over the lazy dog ".repeat(200);

        let mut sink = CompressorSink::new(id);
        for chunk in plaintext.chunks(17) {
            sink.push(chunk).unwrap();
        }
        let compressed = sink.finish().unwrap();

        let mut decompressor = DecompressorSink::new(id);
        for chunk in compressed.chunks(13) {
            decompressor.push(chunk).unwrap();
        }
        let decompressed = decompressor.finish().unwrap();

        assert_eq!(decompressed, plaintext);
    }

    #[test]
    fn none_roundtrip() {
        roundtrip(CompressionId::None);
    }

    #[test]
    fn deflate_roundtrip() {
        roundtrip(CompressionId::Deflate);
    }

    #[test]
    fn lzma_roundtrip() {
        roundtrip(CompressionId::Lzma);
    }

    #[test]
    fn deflate_actually_shrinks_repetitive_input() {
        let plaintext = vec![b'a'; 100_000];
        let mut sink = CompressorSink::new(CompressionId::Deflate);
        sink.push(&plaintext).unwrap();
        let compressed = sink.finish().unwrap();
        assert!(compressed.len() < plaintext.len() / 10);
    }
}
