//! Channel layer: terminal reads, stdin writes and pattern matching.
//!
//! This module handles the byte-level side of a session: accumulating the
//! terminal transcript, waiting for patterns with a deadline, and feeding
//! lines to the child.

mod buffer;
mod expect;
pub mod patterns;
mod pty;
mod sender;

pub use buffer::OutputBuffer;
pub use expect::ExpectReader;
pub use patterns::{Literal, Matcher};
pub use pty::{ChunkSource, PtyReader, ReadOutcome};
pub use sender::LineSender;
