//! Error types for ptyexpect.

use std::io;
use thiserror::Error;

use crate::driver::ExpectTimeout;

/// Main error type for ptyexpect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The child process could not be created
    #[error("Spawn error: {0}")]
    Spawn(#[from] SpawnError),

    /// Writing to the child's stdin failed
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// Reading the terminal output failed
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// A pattern did not compile
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Script construction or parsing failed
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// An expected pattern did not show up in time.
    ///
    /// `expect` returns timeouts as values; this variant only appears when a
    /// caller turns an outcome into a `Result` with `into_match()?`.
    #[error("{0}")]
    Timeout(#[from] ExpectTimeout),

    /// Waiting on or signalling the child failed
    #[error("Process error: {0}")]
    Process(#[source] io::Error),
}

/// Process creation errors (pty, pipe, exec).
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The command line had no program in it
    #[error("Empty command line")]
    EmptyCommand,

    /// The program could not be found
    #[error("Program not found: '{program}'")]
    NotFound { program: String },

    /// Pseudo-terminal allocation failed
    #[error("Failed to open pseudo-terminal: {0}")]
    OpenPty(#[source] nix::Error),

    /// Pipe allocation failed
    #[error("Failed to create stdin pipe: {0}")]
    Pipe(#[source] nix::Error),

    /// Process creation failed at the OS level
    #[error("Failed to spawn '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Input pipe errors.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The input pipe was already closed by the caller
    #[error("Input pipe closed")]
    Closed,

    /// The child closed its end of the pipe (usually because it exited)
    #[error("Broken pipe: {0}")]
    BrokenPipe(#[source] io::Error),

    /// Any other I/O error
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for WriteError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::BrokenPipe {
            WriteError::BrokenPipe(err)
        } else {
            WriteError::Io(err)
        }
    }
}

/// Terminal read errors. A timeout is not one of these.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The terminal was already closed by the caller
    #[error("Terminal closed")]
    Closed,

    /// Every writer of the terminal went away before the pattern showed up
    #[error("End of output reached, buffer contained: {excerpt:?}")]
    Eof { excerpt: String },

    /// Any other I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Script construction errors.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// A step's pattern did not compile
    #[error("Invalid pattern '{pattern}' in script: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The JSON form could not be parsed
    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias using ptyexpect's Error.
pub type Result<T> = std::result::Result<T, Error>;
