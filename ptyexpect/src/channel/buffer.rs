//! Accumulating transcript of terminal output.
//!
//! Everything read from the terminal is appended here and patterns are
//! matched against the whole transcript, not just the newest chunk, so a
//! pattern split across two reads is still found. The buffer only shrinks
//! when the caller asks for it.

use std::borrow::Cow;
use std::ops::Range;

use bytes::{Bytes, BytesMut};

use super::patterns::Matcher;

/// Buffer for accumulating terminal output and searching it for patterns.
#[derive(Debug)]
pub struct OutputBuffer {
    /// The accumulated output.
    buffer: BytesMut,

    /// Escape-sequence filter, present when ANSI stripping is on.
    stripper: Option<AnsiStripper>,
}

impl OutputBuffer {
    /// Create an empty buffer that keeps output byte for byte.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            stripper: None,
        }
    }

    /// Create an empty buffer that removes ANSI escape sequences on the way in.
    pub fn with_ansi_stripping() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            stripper: Some(AnsiStripper::new()),
        }
    }

    /// Append newly read output.
    pub fn extend(&mut self, data: &[u8]) {
        match self.stripper.as_mut() {
            Some(stripper) => stripper.strip_into(data, &mut self.buffer),
            None => self.buffer.extend_from_slice(data),
        }
    }

    /// Search the whole transcript, returning the byte range of the first match.
    pub fn find<M: Matcher + ?Sized>(&self, pattern: &M) -> Option<Range<usize>> {
        pattern.find(&self.buffer)
    }

    /// Check whether the transcript contains a match.
    pub fn contains<M: Matcher + ?Sized>(&self, pattern: &M) -> bool {
        self.find(pattern).is_some()
    }

    /// The last `max_len` bytes, decoded lossily for error reports.
    pub fn tail_excerpt(&self, max_len: usize) -> String {
        let start = self.buffer.len().saturating_sub(max_len);
        String::from_utf8_lossy(&self.buffer[start..]).into_owned()
    }

    /// Take ownership of the contents and reset.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes terminal control sequences while keeping printable text and the
/// whitespace controls that carry layout.
///
/// The parser lives as long as the buffer, so an escape sequence that arrives
/// in two reads is still recognised.
struct AnsiStripper {
    parser: vte::Parser,
}

impl AnsiStripper {
    fn new() -> Self {
        Self {
            parser: vte::Parser::new(),
        }
    }

    fn strip_into(&mut self, data: &[u8], out: &mut BytesMut) {
        let mut sink = Printable { out };
        self.parser.advance(&mut sink, data);
    }
}

impl std::fmt::Debug for AnsiStripper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsiStripper").finish_non_exhaustive()
    }
}

struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}
