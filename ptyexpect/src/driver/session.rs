//! A spawned child under test and the handles used to drive it.

use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, warn};

use super::builder::SessionBuilder;
use super::outcome::ExpectResult;
use super::script::{Script, ScriptResult, Step, StepOutcome, StepRecord};
use crate::channel::{ExpectReader, LineSender, Matcher, OutputBuffer, PtyReader, patterns};
use crate::error::{Error, Result};
use crate::process::{CommandLine, Spawned};

/// One child process with stdin on a pipe and stdout/stderr on a pty.
///
/// Sending and expecting are done from one thread, one call at a time, the
/// way a person types into a terminal and reads what comes back.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use ptyexpect::Session;
///
/// # fn example() -> Result<(), ptyexpect::Error> {
/// let mut session = Session::start("/bin/sh", Duration::from_secs(5))?;
/// session.send_line("echo hello")?;
/// let found = session.expect_regex("hello", Duration::from_secs(2))?.into_match()?;
/// assert_eq!(found.text, "hello");
/// session.stop();
/// # Ok(())
/// # }
/// ```
pub struct Session {
    child: Child,
    pid: u32,
    command: String,
    sender: LineSender,
    reader: ExpectReader<PtyReader>,
    timeout: Duration,
}

impl Session {
    /// Spawn `command_line` with the given default expect timeout.
    ///
    /// Use [`Session::builder`] for anything beyond the defaults.
    pub fn start(command_line: impl Into<CommandLine>, timeout: Duration) -> Result<Self> {
        SessionBuilder::new(command_line).timeout(timeout).start()
    }

    /// Start building a session for `command_line`.
    pub fn builder(command_line: impl Into<CommandLine>) -> SessionBuilder {
        SessionBuilder::new(command_line)
    }

    pub(crate) fn from_spawned(
        spawned: Spawned,
        command: String,
        buffer: OutputBuffer,
        read_chunk_size: usize,
        excerpt_len: usize,
        timeout: Duration,
    ) -> Self {
        let Spawned {
            child,
            pty_master,
            stdin_pipe,
        } = spawned;
        let pid = child.id();
        Self {
            child,
            pid,
            command,
            sender: LineSender::new(stdin_pipe),
            reader: ExpectReader::new(
                PtyReader::new(pty_master),
                buffer,
                read_chunk_size,
                excerpt_len,
            ),
            timeout,
        }
    }

    /// The child's process ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Default budget for [`expect_default`](Self::expect_default).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send `text` and a newline to the child's stdin.
    pub fn send_line(&mut self, text: &str) -> Result<()> {
        self.sender.send_line(text)?;
        Ok(())
    }

    /// Send several lines in order.
    pub fn send_lines(&mut self, lines: &[&str]) -> Result<()> {
        for line in lines {
            self.send_line(line)?;
        }
        Ok(())
    }

    /// Send raw bytes to the child's stdin.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sender.send(data)?;
        Ok(())
    }

    /// Close the child's stdin so it sees end of input.
    pub fn close_input(&mut self) {
        if self.sender.close() {
            debug!("pid {}: stdin closed", self.pid);
        }
    }

    /// Wait up to `timeout` for `pattern` in the transcript.
    ///
    /// A timeout comes back as [`ExpectResult::Timeout`], not as an error.
    /// Errors mean the terminal itself is unusable.
    pub fn expect<M: Matcher + ?Sized>(
        &mut self,
        pattern: &M,
        timeout: Duration,
    ) -> Result<ExpectResult> {
        self.reader.expect(pattern, timeout)
    }

    /// [`expect`](Self::expect) with the session's default timeout.
    pub fn expect_default<M: Matcher + ?Sized>(&mut self, pattern: &M) -> Result<ExpectResult> {
        self.reader.expect(pattern, self.timeout)
    }

    /// Compile `pattern` (line anchors on) and wait for it.
    pub fn expect_regex(&mut self, pattern: &str, timeout: Duration) -> Result<ExpectResult> {
        let regex = patterns::compile(pattern)?;
        self.reader.expect(&regex, timeout)
    }

    /// Run a script's steps in order, stopping at the first timeout.
    pub fn run_script(&mut self, script: &Script) -> Result<ScriptResult> {
        let start = Instant::now();
        let mut records = Vec::with_capacity(script.steps().len());

        for step in script.steps() {
            let step_start = Instant::now();
            let outcome = match step {
                Step::Send(line) => {
                    self.send_line(line)?;
                    StepOutcome::Sent
                }
                Step::Expect { pattern, timeout } => {
                    let budget = timeout.or(script.default_timeout()).unwrap_or(self.timeout);
                    match self.expect(pattern, budget)? {
                        ExpectResult::Matched(found) => StepOutcome::Matched(found),
                        ExpectResult::Timeout(missed) => StepOutcome::TimedOut(missed),
                    }
                }
            };
            let stop = matches!(outcome, StepOutcome::TimedOut(_));
            records.push(StepRecord {
                step: step.describe(),
                outcome,
                elapsed: step_start.elapsed(),
            });
            if stop {
                debug!("pid {}: script stopped at step {}", self.pid, records.len());
                break;
            }
        }

        Ok(ScriptResult::new(records, start.elapsed()))
    }

    /// The transcript read so far.
    pub fn output(&self) -> &OutputBuffer {
        self.reader.buffer()
    }

    /// Forget everything read so far.
    pub fn clear_buffer(&mut self) {
        self.reader.buffer_mut().clear();
    }

    /// Take the transcript, leaving the buffer empty.
    pub fn take_buffer(&mut self) -> Bytes {
        self.reader.buffer_mut().take()
    }

    /// Check whether the child has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child.try_wait().map_err(Error::Process)
    }

    /// Kill the child. Never done implicitly.
    pub fn kill(&mut self) -> Result<()> {
        self.child.kill().map_err(Error::Process)?;
        self.child.wait().map_err(Error::Process)?;
        Ok(())
    }

    /// Close the pty master and the stdin pipe.
    ///
    /// The child is left running; it is expected to exit on its own (after
    /// losing its input) or be killed explicitly. Calling this more than
    /// once is harmless.
    pub fn stop(&mut self) {
        let closed_input = self.sender.close();
        let closed_output = self.reader.close();
        if closed_input || closed_output {
            debug!("pid {}: session stopped ({})", self.pid, self.command);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.sender.is_closed() && self.reader.is_closed()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
        if let Ok(None) = self.child.try_wait() {
            warn!(
                "session for pid {} ({}) dropped while the child is still running",
                self.pid, self.command
            );
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.pid)
            .field("command", &self.command)
            .field("buffered", &self.reader.buffer().len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use regex::bytes::Regex;

    use super::*;
    use crate::error::{ReadError, WriteError};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_ready_at_offset_zero() {
        init_logging();
        let mut session = Session::start("echo ready; sleep 5", Duration::from_secs(5)).unwrap();
        let found = session
            .expect(&Regex::new("ready").unwrap(), Duration::from_secs(5))
            .unwrap()
            .into_match()
            .unwrap();
        assert_eq!(found.text, "ready");
        assert_eq!(found.offset, 0);
        session.kill().unwrap();
    }

    #[test]
    fn test_stop_is_idempotent() {
        init_logging();
        let mut session = Session::start("/bin/cat", Duration::from_secs(1)).unwrap();
        session.stop();
        assert!(session.is_stopped());
        session.stop();
        assert!(session.is_stopped());

        assert!(matches!(
            session.send_line("late"),
            Err(Error::Write(WriteError::Closed))
        ));
        assert!(matches!(
            session.expect_regex("late", Duration::from_millis(10)),
            Err(Error::Read(ReadError::Closed))
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut session = Session::start("/bin/cat", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            session.expect_regex("(", Duration::from_millis(10)),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_eof_after_child_exits() {
        init_logging();
        let mut session = Session::start("echo bye", Duration::from_secs(5)).unwrap();
        let err = session
            .expect_regex("never printed", Duration::from_secs(5))
            .unwrap_err();
        match err {
            Error::Read(ReadError::Eof { excerpt }) => assert!(excerpt.contains("bye")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_clear_buffer_forgets_earlier_output() {
        init_logging();
        let mut session = Session::start("/bin/sh", Duration::from_secs(5)).unwrap();
        session.send_line("echo first").unwrap();
        let pattern = Regex::new("first").unwrap();
        assert!(session.expect_default(&pattern).unwrap().is_match());

        session.clear_buffer();
        assert!(session.output().is_empty());
        assert!(session
            .expect(&pattern, Duration::from_millis(200))
            .unwrap()
            .is_timeout());
    }
}
