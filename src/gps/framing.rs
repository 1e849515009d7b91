// src/gps/framing.rs
//! Reassembly of NMEA lines from arbitrary transport chunks

use tracing::debug;

/// NMEA caps sentences at 82 characters; anything far beyond that without a
/// line feed is line noise.
pub const MAX_FRAME_LEN: usize = 1024;

/// Buffers bytes from the transport and hands out complete lines.
///
/// Reads rarely line up with sentence boundaries, so whatever follows the last
/// `\n` of a chunk is kept until the rest of the line arrives.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
    discarded: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the transport. Empty chunks are fine.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete line, without its terminator.
    ///
    /// Blank lines are skipped. Returns `None` once only a partial line (or
    /// nothing) is left in the buffer.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(end) = self.buf.iter().position(|&b| b == b'\n') else {
                self.drop_oversized_partial();
                return None;
            };

            let raw: Vec<u8> = self.buf.drain(..=end).collect();
            if raw.len() > MAX_FRAME_LEN {
                self.discard(raw.len());
                continue;
            }

            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    /// Lazily iterate over every complete line currently buffered.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { assembler: self }
    }

    /// Bytes held back waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Number of frames thrown away for exceeding [`MAX_FRAME_LEN`]
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn drop_oversized_partial(&mut self) {
        if self.buf.len() > MAX_FRAME_LEN {
            let len = self.buf.len();
            self.buf.clear();
            self.discard(len);
        }
    }

    fn discard(&mut self, len: usize) {
        debug!(bytes = len, "discarding oversized frame");
        self.discarded += 1;
    }
}

pub struct Lines<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.assembler.next_line()
    }
}
