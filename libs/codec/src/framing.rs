//! Frame extraction from the raw byte stream
//!
//! Analyzers deliver transmissions in STX…ETX frames, but TCP gives no
//! message boundaries: a frame routinely arrives split across reads, or
//! several frames arrive in one read. [`FrameDecoder`] owns the accumulation
//! buffer that makes reassembly work: bytes go in as they arrive, complete
//! frames come out, and anything incomplete stays buffered for the next read.
//!
//! Some instrument configurations omit STX/ETX entirely and separate records
//! with CR or CRLF; the decoder falls back to line framing when no STX is
//! present in the buffer.

use crate::constants::{CR, ETX, LF, STX};
use bytes::{Bytes, BytesMut};

/// Incremental frame decoder over an accumulated byte buffer.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Append bytes received from the socket.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes currently held for reassembly.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Extract the next complete frame, if one is present.
    ///
    /// With an STX in the buffer, a frame is complete only once the matching
    /// ETX has also arrived; the returned frame is the span strictly between
    /// the two delimiters, and anything preceding the STX is discarded with
    /// it. Without any STX, the fallback treats a CR-, CRLF-, or
    /// LF-terminated span as one frame. Returns `None` when no complete
    /// frame exists yet; the buffer is retained untouched for the next read.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        if let Some(stx) = find_byte(&self.buffer, STX) {
            let etx = stx + 1 + find_byte(&self.buffer[stx + 1..], ETX)?;
            let mut head = self.buffer.split_to(etx + 1);
            let mut frame = head.split_off(stx + 1);
            frame.truncate(frame.len() - 1);
            return Some(frame.freeze());
        }

        // Line-framing fallback. Leading separators produce empty spans and
        // are consumed rather than returned, so a CRLF never stalls the loop.
        loop {
            let sep = self
                .buffer
                .iter()
                .position(|&b| b == CR || b == LF)?;
            let line = self.buffer.split_to(sep);
            let first = self.buffer.split_to(1)[0];
            if first == CR && self.buffer.first() == Some(&LF) {
                let _ = self.buffer.split_to(1);
            }
            if !line.is_empty() {
                return Some(line.freeze());
            }
        }
    }

    /// Drain whatever remains in the buffer as a final frame.
    ///
    /// Used when a connection goes idle: an instrument that never sent its
    /// closing delimiter still gets its last transmission processed. Leading
    /// frame/record delimiters are stripped; returns `None` if nothing
    /// substantive remains.
    pub fn flush(&mut self) -> Option<Bytes> {
        while let Some(&b) = self.buffer.first() {
            if b == STX || b == CR || b == LF {
                let _ = self.buffer.split_to(1);
            } else {
                break;
            }
        }
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}
