//! An ordered chain of fixed-size byte chunks acting as the in-memory payload for one entry
//! (§3 `PayloadChain`, §4.4 `BufferedPayload`).
//!
//! A chain is either in *writing* state (appendable, not readable) or *reading* state
//! (resettable, not appendable); the transition between the two is one-way, via [`reset`].
//!
//! [`reset`]: BufferedPayload::reset

use std::io::Read;

use crate::primitives::CHUNK_SIZE;

#[derive(Debug)]
struct Chunk {
    data: Box<[u8; CHUNK_SIZE]>,
    end: usize,
}

impl Chunk {
    fn new() -> Self {
        Chunk {
            data: Box::new([0u8; CHUNK_SIZE]),
            end: 0,
        }
    }

    fn remaining(&self) -> usize {
        CHUNK_SIZE - self.end
    }

    fn is_full(&self) -> bool {
        self.end == CHUNK_SIZE
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ChainState {
    Writing,
    Reading,
}

/// An append-only-then-read-once chain of 64 KiB chunks.
///
/// `append`/`read` never interleave: the chain starts in the writing state, and [`reset`] makes
/// a one-way transition into the reading state. A single `BufferedPayload` is not designed to be
/// accessed concurrently.
///
/// [`reset`]: BufferedPayload::reset
pub struct BufferedPayload {
    chunks: Vec<Chunk>,
    state: ChainState,
    read_chunk: usize,
    read_pos: usize,
    total_len: u64,
    on_finish: Option<Box<dyn FnOnce(u64)>>,
}

impl Default for BufferedPayload {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedPayload {
    #[must_use]
    pub fn new() -> Self {
        BufferedPayload {
            chunks: Vec::new(),
            state: ChainState::Writing,
            read_chunk: 0,
            read_pos: 0,
            total_len: 0,
            on_finish: None,
        }
    }

    /// Registers a one-shot callback invoked (with the total byte length written) the first time
    /// [`finish`] is called.
    ///
    /// [`finish`]: BufferedPayload::finish
    pub fn on_finish(&mut self, callback: impl FnOnce(u64) + 'static) {
        self.on_finish = Some(Box::new(callback));
    }

    /// Appends bytes to the chain. Valid only in the writing state.
    ///
    /// # Panics
    /// Panics if called after [`reset`] has transitioned the chain to the reading state - this is
    /// a programmer error (§4.4 "append is valid only in writing state"), not a runtime
    /// condition a caller should need to handle.
    ///
    /// [`reset`]: BufferedPayload::reset
    pub fn append(&mut self, mut bytes: &[u8]) {
        assert_eq!(
            self.state,
            ChainState::Writing,
            "append() called on a BufferedPayload in reading state"
        );

        self.total_len += bytes.len() as u64;

        while !bytes.is_empty() {
            if self.chunks.last().map_or(true, Chunk::is_full) {
                self.chunks.push(Chunk::new());
            }
            let chunk = self.chunks.last_mut().unwrap();
            let take = bytes.len().min(chunk.remaining());
            chunk.data[chunk.end..chunk.end + take].copy_from_slice(&bytes[..take]);
            chunk.end += take;
            bytes = &bytes[take..];
        }
    }

    /// Signals that writing has finished, firing the `on_finish` callback (if any) exactly once.
    pub fn finish(&mut self) {
        if let Some(cb) = self.on_finish.take() {
            cb(self.total_len);
        }
    }

    /// One-way transition from writing to reading state; resets the read cursor to the start.
    pub fn reset(&mut self) {
        self.state = ChainState::Reading;
        self.read_chunk = 0;
        self.read_pos = 0;
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.total_len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Moves this chain's chunks onto the end of `other`'s chain, leaving `self` empty.
    ///
    /// This is O(1) when `other` is empty or its tail chunk is already full - no bytes are
    /// copied, only the chunk `Vec` is spliced.
    pub fn splice_into(&mut self, other: &mut BufferedPayload) {
        if other.chunks.last().map_or(true, Chunk::is_full) {
            other.chunks.append(&mut self.chunks);
        } else {
            // Slow path: the destination's tail chunk has spare room, so chunk boundaries don't
            // line up and we must physically merge bytes into it first.
            for chunk in self.chunks.drain(..) {
                other.append(&chunk.data[..chunk.end]);
            }
        }
        other.total_len += self.total_len;
        self.total_len = 0;
    }
}

impl Read for BufferedPayload {
    /// Valid only in the reading state. Returns `Ok(0)` at end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        assert_eq!(
            self.state,
            ChainState::Reading,
            "read() called on a BufferedPayload in writing state"
        );

        if self.read_chunk >= self.chunks.len() {
            return Ok(0);
        }

        let chunk = &self.chunks[self.read_chunk];
        let available = chunk.end - self.read_pos;
        let take = buf.len().min(available);
        buf[..take].copy_from_slice(&chunk.data[self.read_pos..self.read_pos + take]);
        self.read_pos += take;

        if self.read_pos == chunk.end {
            self.read_chunk += 1;
            self.read_pos = 0;
        }

        Ok(take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Read as _;
    use std::rc::Rc;

    #[test]
    fn append_then_read_roundtrip() {
        let mut payload = BufferedPayload::new();
        let data = vec![7u8; CHUNK_SIZE * 2 + 123];
        payload.append(&data);
        assert_eq!(payload.len(), data.len() as u64);

        payload.reset();
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn append_in_small_pieces() {
        let mut payload = BufferedPayload::new();
        for chunk in b"hello world".chunks(3) {
            payload.append(chunk);
        }
        payload.reset();
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn on_finish_fires_once_with_total_length() {
        let payload = Rc::new(RefCell::new(BufferedPayload::new()));
        let seen = Rc::new(RefCell::new(None));

        payload.borrow_mut().append(b"abcdef");
        {
            let seen = seen.clone();
            payload.borrow_mut().on_finish(move |len| {
                *seen.borrow_mut() = Some(len);
            });
        }
        payload.borrow_mut().finish();
        assert_eq!(*seen.borrow(), Some(6));
    }

    #[test]
    fn splice_into_preserves_order() {
        let mut a = BufferedPayload::new();
        a.append(b"first-");
        let mut b = BufferedPayload::new();
        b.append(b"second");

        a.splice_into(&mut b);
        assert_eq!(a.len(), 0);
        assert_eq!(b.len(), 12);

        b.reset();
        let mut out = Vec::new();
        b.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"first-second");
    }

    #[test]
    fn splice_into_across_chunk_boundary() {
        let mut a = BufferedPayload::new();
        a.append(&vec![1u8; 10]);
        let mut b = BufferedPayload::new();
        b.append(&vec![2u8; CHUNK_SIZE - 5]); // tail chunk has 5 bytes of spare room

        a.splice_into(&mut b);
        b.reset();
        let mut out = Vec::new();
        b.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), CHUNK_SIZE + 5);
        assert_eq!(&out[..CHUNK_SIZE - 5], &vec![2u8; CHUNK_SIZE - 5][..]);
        assert_eq!(&out[CHUNK_SIZE - 5..], &vec![1u8; 10][..]);
    }
}
