//! Outcome of an `expect` call.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result of waiting for a pattern: a match or a timeout, nothing in between.
///
/// A timeout is an ordinary outcome here, not an error. Callers decide
/// whether it fails their test; [`into_match`](Self::into_match) turns it
/// into an `Err` for use with `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectResult {
    /// The pattern was found in the transcript.
    Matched(Match),

    /// The budget ran out first.
    Timeout(ExpectTimeout),
}

impl ExpectResult {
    pub fn is_match(&self) -> bool {
        matches!(self, ExpectResult::Matched(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExpectResult::Timeout(_))
    }

    /// Borrow the match, if any.
    pub fn as_match(&self) -> Option<&Match> {
        match self {
            ExpectResult::Matched(m) => Some(m),
            ExpectResult::Timeout(_) => None,
        }
    }

    /// Convert into a `Result`, treating a timeout as an error.
    pub fn into_match(self) -> Result<Match, ExpectTimeout> {
        match self {
            ExpectResult::Matched(m) => Ok(m),
            ExpectResult::Timeout(t) => Err(t),
        }
    }
}

/// A successful match in the session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The matched text (lossy UTF-8).
    pub text: String,

    /// Byte offset of the match start in the transcript.
    pub offset: usize,

    /// Byte offset one past the match end.
    pub end: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.offset
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A pattern that did not show up within its budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "pattern {pattern} not found within {:.1} seconds, buffer contained: {excerpt:?}",
    .timeout.as_secs_f64()
)]
pub struct ExpectTimeout {
    /// Description of the pattern that was searched for.
    pub pattern: String,

    /// The budget that was exhausted.
    pub timeout: Duration,

    /// Trailing part of the transcript at the time of the timeout.
    pub excerpt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_report() {
        let timeout = ExpectTimeout {
            pattern: "/sleep/".to_string(),
            timeout: Duration::from_millis(1500),
            excerpt: "0 totoExpect.txt\r\n".to_string(),
        };
        assert_eq!(
            timeout.to_string(),
            r#"pattern /sleep/ not found within 1.5 seconds, buffer contained: "0 totoExpect.txt\r\n""#
        );
    }

    #[test]
    fn test_into_match() {
        let matched = ExpectResult::Matched(Match {
            text: "ready".to_string(),
            offset: 0,
            end: 5,
        });
        assert!(matched.is_match());
        assert_eq!(matched.as_match().map(Match::len), Some(5));
        assert_eq!(matched.into_match().unwrap().text, "ready");

        let timed_out = ExpectResult::Timeout(ExpectTimeout {
            pattern: "/x/".to_string(),
            timeout: Duration::from_secs(1),
            excerpt: String::new(),
        });
        assert!(timed_out.is_timeout());
        assert!(timed_out.into_match().is_err());
    }
}
