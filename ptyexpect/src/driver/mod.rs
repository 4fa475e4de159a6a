//! High-level driver for terminal sessions.
//!
//! The driver layer provides the main API: start a child, send it lines,
//! and wait for patterns in its output.

mod builder;
mod outcome;
pub mod script;
mod session;

pub use builder::SessionBuilder;
pub use outcome::{ExpectResult, ExpectTimeout, Match};
pub use script::{Script, ScriptBuilder, ScriptResult, Step, StepOutcome, StepRecord};
pub use session::Session;
