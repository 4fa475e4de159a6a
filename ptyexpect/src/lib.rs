//! # ptyexpect
//!
//! Blocking expect driver for testing interactive programs through a
//! pseudo-terminal.
//!
//! A child process is started with its stdin on a pipe and its stdout and
//! stderr on a pty. Lines are typed into the pipe, and the terminal output is
//! collected into a transcript that regular expressions are matched against,
//! each wait bounded by a timeout.
//!
//! ## Features
//!
//! - stdin on a pipe, stdout/stderr on a pty, like an interactive terminal
//!   whose keystrokes come from a script
//! - Whole-transcript matching: patterns split across reads are found, and
//!   earlier output stays visible to later `expect` calls
//! - Timeouts are values ([`ExpectResult::Timeout`]) with a readable report,
//!   not errors
//! - Optional ANSI escape stripping
//! - Send/expect scripts, built in code or loaded from JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ptyexpect::Session;
//!
//! fn main() -> Result<(), ptyexpect::Error> {
//!     let mut session = Session::start("/bin/sh", Duration::from_secs(5))?;
//!
//!     session.send_line("touch totoExpect.txt")?;
//!     session.send_line("ls -s totoExpect.txt")?;
//!
//!     let found = session
//!         .expect_regex(r"0 totoExpect\.txt", Duration::from_secs(5))?
//!         .into_match()?;
//!     println!("found {:?} at byte {}", found.text, found.offset);
//!
//!     session.stop();
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod process;

// Re-export main types for convenience
pub use channel::{Literal, Matcher, OutputBuffer};
pub use config::SessionConfig;
pub use driver::{
    ExpectResult, ExpectTimeout, Match, Script, ScriptBuilder, ScriptResult, Session,
    SessionBuilder,
};
pub use error::Error;
pub use process::CommandLine;
