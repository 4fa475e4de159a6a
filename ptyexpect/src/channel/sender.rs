//! Line-oriented input to the child's stdin pipe.

use std::fs::File;
use std::io::Write;

use log::debug;

use crate::error::WriteError;

/// Write end of the child's stdin pipe.
///
/// Every write goes straight to the pipe; if the pipe buffer is full the call
/// blocks until the child reads. Failures are reported as they happen, with
/// no retries.
#[derive(Debug)]
pub struct LineSender {
    pipe: Option<File>,
}

impl LineSender {
    pub(crate) fn new(pipe: File) -> Self {
        Self { pipe: Some(pipe) }
    }

    /// Send `text` followed by a single `\n`.
    pub fn send_line(&mut self, text: &str) -> Result<(), WriteError> {
        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(b'\n');
        debug!("send_line: {:?}", text);
        self.write_all(&line)
    }

    /// Send raw bytes with nothing appended.
    pub fn send(&mut self, data: &[u8]) -> Result<(), WriteError> {
        debug!("send: {} bytes", data.len());
        self.write_all(data)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let pipe = self.pipe.as_mut().ok_or(WriteError::Closed)?;
        pipe.write_all(data)?;
        Ok(())
    }

    /// Close the pipe, which the child sees as end of input.
    ///
    /// Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        self.pipe.take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.pipe.is_none()
    }
}
