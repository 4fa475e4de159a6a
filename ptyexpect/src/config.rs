//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a session.
///
/// Durations are written as integer milliseconds in serialized form:
///
/// ```rust
/// use ptyexpect::SessionConfig;
///
/// let config: SessionConfig =
///     serde_json::from_str(r#"{ "timeout_ms": 5000, "strip_ansi": true }"#).unwrap();
/// assert_eq!(config.timeout.as_secs(), 5);
/// assert_eq!(config.terminal_height, 24);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default budget for `expect` calls that don't name one.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Terminal width.
    pub terminal_width: u16,

    /// Terminal height.
    pub terminal_height: u16,

    /// Largest single read from the terminal.
    pub read_chunk_size: usize,

    /// How many trailing bytes of output a timeout report quotes.
    pub excerpt_len: usize,

    /// Remove ANSI escape sequences before buffering output.
    pub strip_ansi: bool,

    /// Start the child in a new session with the pty as its controlling
    /// terminal.
    pub controlling_terminal: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            read_chunk_size: 4096,
            excerpt_len: 256,
            strip_ansi: false,
            controlling_terminal: false,
        }
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
