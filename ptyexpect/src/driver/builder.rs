//! Builder for starting sessions.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use super::session::Session;
use crate::channel::OutputBuffer;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::process::{CommandLine, ProcessHarness, SpawnRequest};

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use ptyexpect::SessionBuilder;
///
/// # fn example() -> Result<(), ptyexpect::Error> {
/// let session = SessionBuilder::new("/bin/bash --norc")
///     .current_dir("/tmp")
///     .env("PS1", "$ ")
///     .timeout(Duration::from_secs(5))
///     .strip_ansi(true)
///     .start()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    command: CommandLine,
    env: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a new builder for a command line.
    ///
    /// A string is parsed with [`CommandLine::parse`]; pass a
    /// [`CommandLine`] to control that yourself.
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self {
            command: command.into(),
            env: Vec::new(),
            current_dir: None,
            config: SessionConfig::default(),
        }
    }

    /// Build a session for an explicit argument vector.
    pub fn argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self::new(CommandLine::argv(argv))
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        let arg: OsString = arg.into();
        self.command.push_args([arg]);
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.command.push_args(args);
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run the child in `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Replace all tunables at once.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default expect timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u16, height: u16) -> Self {
        self.config.terminal_width = width;
        self.config.terminal_height = height;
        self
    }

    /// Strip ANSI escape sequences from the transcript.
    pub fn strip_ansi(mut self, strip: bool) -> Self {
        self.config.strip_ansi = strip;
        self
    }

    /// How much trailing output timeout reports include.
    pub fn excerpt_len(mut self, len: usize) -> Self {
        self.config.excerpt_len = len;
        self
    }

    /// Largest single read from the terminal.
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Give the child the pty as its controlling terminal, in a new session.
    pub fn controlling_terminal(mut self, enabled: bool) -> Self {
        self.config.controlling_terminal = enabled;
        self
    }

    /// Spawn the child and return the live session.
    pub fn start(self) -> Result<Session> {
        let request = SpawnRequest {
            command: self.command,
            env: self.env,
            current_dir: self.current_dir,
            terminal_width: self.config.terminal_width,
            terminal_height: self.config.terminal_height,
            controlling_terminal: self.config.controlling_terminal,
        };
        let spawned = ProcessHarness::spawn(&request)?;

        let buffer = if self.config.strip_ansi {
            OutputBuffer::with_ansi_stripping()
        } else {
            OutputBuffer::new()
        };

        Ok(Session::from_spawned(
            spawned,
            request.command.display(),
            buffer,
            self.config.read_chunk_size,
            self.config.excerpt_len,
            self.config.timeout,
        ))
    }
}
