//! The expect loop: read until a pattern shows up or the budget runs out.

use std::time::{Duration, Instant};

use log::{debug, trace};

use super::buffer::OutputBuffer;
use super::patterns::Matcher;
use super::pty::{ChunkSource, ReadOutcome};
use crate::driver::{ExpectResult, ExpectTimeout, Match};
use crate::error::{ReadError, Result};

/// Reads terminal output into an [`OutputBuffer`] and matches patterns
/// against it.
///
/// The buffer persists across calls: output that arrived while waiting for
/// one pattern is still there for the next `expect`.
#[derive(Debug)]
pub struct ExpectReader<S> {
    /// Output source; `None` once closed.
    source: Option<S>,

    /// Transcript of everything read so far.
    buffer: OutputBuffer,

    /// Scratch space for a single read.
    chunk: Vec<u8>,

    /// Set once the source reported end of output.
    eof: bool,

    /// Bytes of transcript quoted in timeout and EOF reports.
    excerpt_len: usize,
}

impl<S: ChunkSource> ExpectReader<S> {
    /// Create a reader over `source`.
    pub fn new(source: S, buffer: OutputBuffer, read_chunk_size: usize, excerpt_len: usize) -> Self {
        Self {
            source: Some(source),
            buffer,
            chunk: vec![0; read_chunk_size.max(1)],
            eof: false,
            excerpt_len,
        }
    }

    /// Wait up to `timeout` for `pattern` to appear in the transcript.
    ///
    /// Returns at once, without reading, if the transcript already matches.
    /// The budget starts when this method is called.
    pub fn expect<M: Matcher + ?Sized>(
        &mut self,
        pattern: &M,
        timeout: Duration,
    ) -> Result<ExpectResult> {
        // A budget too large to add to the clock means no deadline at all.
        let deadline = Instant::now().checked_add(timeout);

        if let Some(found) = self.matched(pattern) {
            return Ok(found);
        }

        loop {
            if self.eof {
                return Err(ReadError::Eof {
                    excerpt: self.buffer.tail_excerpt(self.excerpt_len),
                }
                .into());
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            if remaining.is_zero() {
                debug!(
                    "expect {}: timed out after {:?} ({} bytes buffered)",
                    pattern.describe(),
                    timeout,
                    self.buffer.len()
                );
                return Ok(ExpectResult::Timeout(ExpectTimeout {
                    pattern: pattern.describe(),
                    timeout,
                    excerpt: self.buffer.tail_excerpt(self.excerpt_len),
                }));
            }

            let source = self.source.as_mut().ok_or(ReadError::Closed)?;
            match source
                .read_chunk(&mut self.chunk, remaining)
                .map_err(ReadError::Io)?
            {
                ReadOutcome::Data(n) => {
                    self.buffer.extend(&self.chunk[..n]);
                    trace!("expect: +{} bytes, {} buffered", n, self.buffer.len());
                    if let Some(found) = self.matched(pattern) {
                        return Ok(found);
                    }
                }
                ReadOutcome::TimedOut => {}
                ReadOutcome::Eof => {
                    debug!("expect {}: end of output", pattern.describe());
                    self.eof = true;
                }
            }
        }
    }

    fn matched<M: Matcher + ?Sized>(&self, pattern: &M) -> Option<ExpectResult> {
        let range = self.buffer.find(pattern)?;
        let text = String::from_utf8_lossy(&self.buffer.as_slice()[range.clone()]).into_owned();
        debug!("expect {}: matched {:?} at {}", pattern.describe(), text, range.start);
        Some(ExpectResult::Matched(Match {
            text,
            offset: range.start,
            end: range.end,
        }))
    }

    /// The transcript read so far.
    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Mutable access to the transcript, for clearing or taking it.
    pub fn buffer_mut(&mut self) -> &mut OutputBuffer {
        &mut self.buffer
    }

    /// Whether the source has reported end of output.
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    /// Drop the source. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        self.source.take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use regex::bytes::Regex;

    use super::*;
    use crate::channel::Literal;
    use crate::error::Error;

    /// Plays back chunks, each after a delay measured from the previous one.
    struct ScriptedSource {
        chunks: VecDeque<(Duration, Vec<u8>)>,
        end_with_eof: bool,
        reads: usize,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<(Duration, &[u8])>) -> Self {
            Self {
                chunks: chunks.into_iter().map(|(d, c)| (d, c.to_vec())).collect(),
                end_with_eof: false,
                reads: 0,
            }
        }

        fn immediate(chunks: &[&[u8]]) -> Self {
            Self::new(chunks.iter().map(|c| (Duration::ZERO, *c)).collect())
        }
    }

    impl ChunkSource for ScriptedSource {
        fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
            self.reads += 1;
            let Some((delay, _)) = self.chunks.front_mut() else {
                if self.end_with_eof {
                    return Ok(ReadOutcome::Eof);
                }
                std::thread::sleep(timeout);
                return Ok(ReadOutcome::TimedOut);
            };
            if *delay > timeout {
                *delay -= timeout;
                std::thread::sleep(timeout);
                return Ok(ReadOutcome::TimedOut);
            }
            std::thread::sleep(*delay);
            let (_, mut data) = self.chunks.pop_front().unwrap();
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            if n < data.len() {
                self.chunks.push_front((Duration::ZERO, data.split_off(n)));
            }
            Ok(ReadOutcome::Data(n))
        }
    }

    fn reader(source: ScriptedSource) -> ExpectReader<ScriptedSource> {
        ExpectReader::new(source, OutputBuffer::new(), 4096, 64)
    }

    #[test]
    fn test_match_found_regardless_of_chunking() {
        let stream = b"$ touch totoExpect.txt\r\n0 totoExpect.txt\r\n[1]+ Running sleep 10 &\r\n";
        let pattern = Regex::new(r"0 totoExpect\.txt").unwrap();
        let expected = 24;

        for size in 1..=stream.len() {
            let chunks: Vec<&[u8]> = stream.chunks(size).collect();
            let mut reader = reader(ScriptedSource::immediate(&chunks));
            let result = reader.expect(&pattern, Duration::from_secs(5)).unwrap();
            let found = result.into_match().unwrap();
            assert_eq!(found.offset, expected, "chunk size {}", size);
            assert_eq!(found.text, "0 totoExpect.txt");
        }
    }

    #[test]
    fn test_small_read_chunks_still_match() {
        let mut reader = ExpectReader::new(
            ScriptedSource::immediate(&[&b"hello world"[..]]),
            OutputBuffer::new(),
            3,
            64,
        );
        let found = reader
            .expect(&Regex::new("world").unwrap(), Duration::from_secs(1))
            .unwrap()
            .into_match()
            .unwrap();
        assert_eq!(found.offset, 6);
    }

    #[test]
    fn test_already_matched_returns_without_reading() {
        let mut reader = reader(ScriptedSource::immediate(&[&b"ready\r\n"[..]]));
        let pattern = Regex::new("ready").unwrap();
        assert!(reader.expect(&pattern, Duration::from_secs(1)).unwrap().is_match());
        let reads = reader.source.as_ref().unwrap().reads;

        let again = reader.expect(&pattern, Duration::ZERO).unwrap();
        assert_eq!(again.as_match().unwrap().offset, 0);
        assert_eq!(reader.source.as_ref().unwrap().reads, reads);
    }

    #[test]
    fn test_timeout_is_a_value_with_excerpt() {
        let mut reader = reader(ScriptedSource::immediate(&[&b"hello\r\n"[..]]));
        let start = Instant::now();
        let result = reader
            .expect(&Regex::new("goodbye").unwrap(), Duration::from_millis(100))
            .unwrap();
        let elapsed = start.elapsed();

        let ExpectResult::Timeout(timeout) = result else {
            panic!("expected a timeout");
        };
        assert_eq!(timeout.pattern, "/goodbye/");
        assert_eq!(timeout.excerpt, "hello\r\n");
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
    }

    #[test]
    fn test_unbounded_budget_does_not_overflow() {
        let mut slow = reader(ScriptedSource::new(vec![
            (Duration::from_millis(20), &b"h"[..]),
            (Duration::from_millis(20), &b"i\r\n"[..]),
        ]));
        let found = slow
            .expect(&Literal::new("hi"), Duration::MAX)
            .unwrap()
            .into_match()
            .unwrap();
        assert_eq!(found.offset, 0);

        let mut source = ScriptedSource::immediate(&[&b"bye\r\n"[..]]);
        source.end_with_eof = true;
        let mut ended = reader(source);
        let err = ended
            .expect(&Literal::new("never"), Duration::from_secs(u64::MAX))
            .unwrap_err();
        assert!(matches!(err, Error::Read(ReadError::Eof { .. })));
    }

    #[test]
    fn test_buffer_survives_a_timeout() {
        let mut reader = reader(ScriptedSource::new(vec![
            (Duration::ZERO, &b"started\r\n"[..]),
            (Duration::from_millis(300), &b"delayed output\r\n"[..]),
        ]));
        let pattern = Regex::new("delayed").unwrap();

        assert!(reader.expect(&pattern, Duration::from_millis(50)).unwrap().is_timeout());
        let found = reader
            .expect(&pattern, Duration::from_secs(5))
            .unwrap()
            .into_match()
            .unwrap();
        assert_eq!(found.offset, 9);
        assert!(reader.buffer().as_str_lossy().starts_with("started"));
    }

    #[test]
    fn test_eof_is_a_read_error() {
        let mut source = ScriptedSource::immediate(&[&b"bye\r\n"[..]]);
        source.end_with_eof = true;
        let mut reader = reader(source);

        let err = reader
            .expect(&Regex::new("never").unwrap(), Duration::from_secs(5))
            .unwrap_err();
        match err {
            Error::Read(ReadError::Eof { excerpt }) => assert_eq!(excerpt, "bye\r\n"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(reader.at_eof());

        // Output that arrived before the end can still be matched.
        assert!(reader
            .expect(&Regex::new("bye").unwrap(), Duration::ZERO)
            .unwrap()
            .is_match());
    }

    #[test]
    fn test_closed_reader() {
        let mut reader = reader(ScriptedSource::immediate(&[]));
        assert!(reader.close());
        assert!(!reader.close());
        let err = reader
            .expect(&Regex::new("x").unwrap(), Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, Error::Read(ReadError::Closed)));
    }
}
