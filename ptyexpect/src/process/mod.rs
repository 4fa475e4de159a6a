//! Process layer: pseudo-terminal and pipe allocation and child spawning.
//!
//! The child gets the pipe's read end as stdin and the pty slave as stdout
//! and stderr. The parent keeps only the pty master and the pipe's write end.

mod command;
mod harness;

pub use command::{CommandLine, SHELL};
pub use harness::{ProcessHarness, SpawnRequest, Spawned};
