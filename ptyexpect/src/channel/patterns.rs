//! Pattern matching over terminal output.

use std::ops::Range;

use memchr::memmem;
use regex::bytes::{Regex, RegexBuilder};

/// Trait for output matching - regex by default, extensible for custom matchers.
pub trait Matcher: Send + Sync {
    /// Returns the byte range of the first match, or None if no match.
    fn find(&self, data: &[u8]) -> Option<Range<usize>>;

    /// Human-readable form of the pattern, used in timeout reports.
    fn describe(&self) -> String;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find(data).is_some()
    }
}

/// Regex-based matcher (the default implementation).
///
/// Matching runs on raw bytes, so invalid UTF-8 in the terminal stream never
/// makes a search fail; it just can't be part of a Unicode-aware match.
impl Matcher for Regex {
    fn find(&self, data: &[u8]) -> Option<Range<usize>> {
        Regex::find(self, data).map(|m| m.range())
    }

    fn describe(&self) -> String {
        format!("/{}/", self.as_str())
    }
}

/// Exact substring matcher.
#[derive(Debug, Clone)]
pub struct Literal {
    text: String,
    finder: memmem::Finder<'static>,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let finder = memmem::Finder::new(text.as_bytes()).into_owned();
        Self { text, finder }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Matcher for Literal {
    fn find(&self, data: &[u8]) -> Option<Range<usize>> {
        self.finder
            .find(data)
            .map(|start| start..start + self.text.len())
    }

    fn describe(&self) -> String {
        format!("{:?}", self.text)
    }
}

/// Compile a pattern string for use against a terminal transcript.
///
/// `^` and `$` match at line boundaries, since the transcript holds many
/// lines of output. `\r` before a line end is part of the line, so patterns
/// anchored with `$` should allow for it (`\r?$`).
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).multi_line(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_matcher_range() {
        let pattern = Regex::new(r"\d+ totoExpect\.txt").unwrap();
        let data = b"$ ls -s\r\n0 totoExpect.txt\r\n";
        assert_eq!(Matcher::find(&pattern, data), Some(9..25));
        assert_eq!(pattern.describe(), r"/\d+ totoExpect\.txt/");
    }

    #[test]
    fn test_regex_tolerates_invalid_utf8() {
        let pattern = Regex::new("sleep").unwrap();
        let data = b"\xff\xfe[1]+ Running sleep 10 &";
        assert_eq!(Matcher::find(&pattern, data), Some(15..20));
    }

    #[test]
    fn test_literal_matcher() {
        let literal = Literal::new("a.b");
        assert_eq!(literal.find(b"xxa.bxx"), Some(2..5));
        assert!(!literal.is_match(b"axb"));
        assert_eq!(literal.describe(), "\"a.b\"");
    }

    #[test]
    fn test_compile_uses_line_anchors() {
        let pattern = compile(r"^hello\r?$").unwrap();
        assert!(pattern.is_match(b"first\r\nhello\r\nlast"));

        let plain = Regex::new(r"^hello\r?$").unwrap();
        assert!(!plain.is_match(b"first\r\nhello\r\nlast"));
    }

    #[test]
    fn test_compile_rejects_invalid() {
        assert!(compile("(unclosed").is_err());
    }
}
