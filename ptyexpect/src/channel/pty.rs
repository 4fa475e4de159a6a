//! Deadline-bounded reads from the pseudo-terminal master.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::time::Duration;

use log::trace;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

/// What a single bounded read produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were written into the buffer.
    Data(usize),

    /// Nothing arrived before the timeout. Also used for spurious wakeups;
    /// the caller re-checks its own deadline.
    TimedOut,

    /// The writing side is gone and no more data will arrive.
    Eof,
}

/// A byte stream that can be read with a timeout.
///
/// The expect loop only talks to this trait, so it can be driven by a real
/// terminal or by a scripted source in tests.
pub trait ChunkSource {
    /// Wait at most `timeout` for data and read what is available into `buf`.
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome>;
}

/// The caller's end of the pseudo-terminal.
///
/// The descriptor is non-blocking; readiness is awaited with `poll(2)`.
#[derive(Debug)]
pub struct PtyReader {
    master: File,
}

impl PtyReader {
    pub(crate) fn new(master: File) -> Self {
        Self { master }
    }
}

impl ChunkSource for PtyReader {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        {
            let mut fds = [PollFd::new(self.master.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, poll_timeout(timeout)) {
                Ok(0) => return Ok(ReadOutcome::TimedOut),
                Ok(_) => {}
                Err(Errno::EINTR) => return Ok(ReadOutcome::TimedOut),
                Err(e) => return Err(e.into()),
            }
        }

        match self.master.read(buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => {
                trace!("pty read: {} bytes", n);
                Ok(ReadOutcome::Data(n))
            }
            // EIO on the master means every holder of the slave has closed it.
            Err(e) if e.raw_os_error() == Some(libc::EIO) => Ok(ReadOutcome::Eof),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(ReadOutcome::TimedOut)
            }
            Err(e) => Err(e),
        }
    }
}

/// Convert a remaining budget to a poll timeout, rounding up so that a poll
/// that times out has really used up the budget.
fn poll_timeout(timeout: Duration) -> PollTimeout {
    let millis = timeout.as_micros().div_ceil(1000);
    u32::try_from(millis)
        .ok()
        .and_then(|ms| PollTimeout::try_from(ms).ok())
        .unwrap_or(PollTimeout::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_rounds_up() {
        assert_eq!(poll_timeout(Duration::from_micros(1)), PollTimeout::try_from(1u32).unwrap());
        assert_eq!(poll_timeout(Duration::from_millis(250)), PollTimeout::try_from(250u32).unwrap());
        assert_eq!(poll_timeout(Duration::ZERO), PollTimeout::ZERO);
    }

    #[test]
    fn test_poll_timeout_saturates() {
        assert_eq!(poll_timeout(Duration::from_secs(u64::MAX)), PollTimeout::MAX);
    }
}
