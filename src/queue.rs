//! Byte intake queue.
//!
//! The serial transport delivers replies in arbitrarily sized chunks with no
//! alignment to protocol tokens: a banner may arrive split across reads, or a
//! status byte may coalesce with the bytes that follow it. All framing is
//! reconstructed here. Bytes are consumed strictly in arrival order, a failed
//! consume leaves the queue untouched, and a flush discards everything.

use bytes::{Bytes, BytesMut};

#[derive(Debug, Default)]
pub struct InputQueue {
    buf: BytesMut,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Appends a received chunk to the tail of the queue.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Removes and returns the first `n` bytes, or `None` (with the queue
    /// unchanged) when fewer than `n` bytes are buffered.
    pub fn try_consume_bytes(&mut self, n: usize) -> Option<Bytes> {
        if self.buf.len() < n {
            return None;
        }
        Some(self.buf.split_to(n).freeze())
    }

    /// Same as [`try_consume_bytes`](Self::try_consume_bytes), decoding the
    /// span one byte per character. Device banners and status tokens are
    /// plain ASCII.
    pub fn try_consume_text(&mut self, n: usize) -> Option<String> {
        let span = self.try_consume_bytes(n)?;
        Some(span.iter().map(|&b| b as char).collect())
    }

    /// Discards all buffered bytes. Used after every completed protocol phase
    /// so stray reply bytes cannot corrupt the next token match.
    pub fn flush(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
