//! Scripted send/expect sequences.
//!
//! Terminal tests usually type a few commands and then check for a few
//! patterns, in order:
//!
//! ```text
//! send   touch totoExpect.txt
//! send   sleep 10 &
//! send   ls -s totoExpect.txt
//! send   jobs
//! expect 0 totoExpect.txt
//! expect sleep
//! ```
//!
//! A [`Script`] holds such a sequence. It can be built in code with
//! [`ScriptBuilder`] or loaded from JSON, and is run with
//! [`Session::run_script`](super::Session::run_script).

use std::time::Duration;

use regex::bytes::Regex;
use serde::Deserialize;

use super::outcome::{ExpectTimeout, Match};
use crate::channel::patterns;
use crate::error::{Result, ScriptError};

/// One step of a script.
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a line to the child.
    Send(String),

    /// Wait for a pattern, with an optional budget for this step alone.
    Expect {
        pattern: Regex,
        timeout: Option<Duration>,
    },
}

impl Step {
    /// One-line description for step records.
    pub fn describe(&self) -> String {
        match self {
            Step::Send(line) => format!("send {:?}", line),
            Step::Expect { pattern, .. } => format!("expect /{}/", pattern.as_str()),
        }
    }
}

/// A compiled send/expect sequence.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ptyexpect::Script;
///
/// let script = Script::builder()
///     .send("touch totoExpect.txt")
///     .send("ls -s totoExpect.txt")
///     .expect(r"0 totoExpect\.txt")
///     .with_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(script.steps().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Script {
    steps: Vec<Step>,
    default_timeout: Option<Duration>,
}

impl Script {
    pub fn builder() -> ScriptBuilder {
        ScriptBuilder::new()
    }

    /// Parse the JSON form:
    ///
    /// ```json
    /// {
    ///   "timeout_ms": 5000,
    ///   "steps": [
    ///     { "send": "jobs" },
    ///     { "expect": { "pattern": "sleep", "timeout_ms": 1000 } }
    ///   ]
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ScriptDoc = serde_json::from_str(json).map_err(ScriptError::Parse)?;
        let mut builder = ScriptBuilder::new();
        builder.default_timeout = doc.timeout_ms.map(Duration::from_millis);
        builder.steps = doc
            .steps
            .into_iter()
            .map(|step| match step {
                StepDoc::Send(line) => PendingStep::Send(line),
                StepDoc::Expect { pattern, timeout_ms } => PendingStep::Expect {
                    pattern,
                    timeout: timeout_ms.map(Duration::from_millis),
                },
            })
            .collect();
        builder.build()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Budget for expect steps that don't set their own.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptDoc {
    #[serde(default)]
    timeout_ms: Option<u64>,
    steps: Vec<StepDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum StepDoc {
    Send(String),
    Expect {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Clone)]
enum PendingStep {
    Send(String),
    Expect {
        pattern: String,
        timeout: Option<Duration>,
    },
}

/// Builder for scripts. Patterns are compiled by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    steps: Vec<PendingStep>,
    default_timeout: Option<Duration>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line to send.
    pub fn send(mut self, line: impl Into<String>) -> Self {
        self.steps.push(PendingStep::Send(line.into()));
        self
    }

    /// Add a pattern to wait for, using the default timeout.
    pub fn expect(mut self, pattern: impl Into<String>) -> Self {
        self.steps.push(PendingStep::Expect {
            pattern: pattern.into(),
            timeout: None,
        });
        self
    }

    /// Add a pattern to wait for with its own timeout.
    pub fn expect_within(mut self, pattern: impl Into<String>, timeout: Duration) -> Self {
        self.steps.push(PendingStep::Expect {
            pattern: pattern.into(),
            timeout: Some(timeout),
        });
        self
    }

    /// Set the default timeout for expect steps.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Compile every pattern and produce the script.
    pub fn build(self) -> Result<Script> {
        let steps = self
            .steps
            .into_iter()
            .map(|step| match step {
                PendingStep::Send(line) => Ok(Step::Send(line)),
                PendingStep::Expect { pattern, timeout } => match patterns::compile(&pattern) {
                    Ok(regex) => Ok(Step::Expect {
                        pattern: regex,
                        timeout,
                    }),
                    Err(source) => Err(ScriptError::InvalidPattern { pattern, source }),
                },
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Script {
            steps,
            default_timeout: self.default_timeout,
        })
    }
}

/// What happened at one step.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The line was written.
    Sent,

    /// The pattern was found.
    Matched(Match),

    /// The pattern was not found in time; the script stopped here.
    TimedOut(ExpectTimeout),
}

/// Record of one executed step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Description of the step.
    pub step: String,

    /// What happened.
    pub outcome: StepOutcome,

    /// Time spent on this step.
    pub elapsed: Duration,
}

/// Result of running a script.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Records for the steps that ran, in order.
    pub steps: Vec<StepRecord>,

    /// Total time for the script.
    pub elapsed: Duration,

    /// Whether an expect step timed out.
    pub failed: bool,
}

impl ScriptResult {
    pub fn new(steps: Vec<StepRecord>, elapsed: Duration) -> Self {
        let failed = steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::TimedOut(_)));
        Self {
            steps,
            elapsed,
            failed,
        }
    }

    /// The timeout that stopped the script, if any.
    pub fn timeout(&self) -> Option<&ExpectTimeout> {
        self.steps.iter().find_map(|s| match &s.outcome {
            StepOutcome::TimedOut(t) => Some(t),
            _ => None,
        })
    }

    /// All matches, in step order.
    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.steps.iter().filter_map(|s| match &s.outcome {
            StepOutcome::Matched(m) => Some(m),
            _ => None,
        })
    }

    /// Turn a failed run into an error.
    pub fn into_result(self) -> std::result::Result<Self, ExpectTimeout> {
        match self.timeout() {
            Some(timeout) => Err(timeout.clone()),
            None => Ok(self),
        }
    }
}
