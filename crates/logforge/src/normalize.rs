//! Leading-timestamp removal for log lines.
//!
//! The same event logged at two different instants must produce the same
//! fingerprint, so the timestamp prefix a runtime or application prepends is
//! stripped before hashing. Recognised prefixes are tried in order; the first
//! pattern that matches wins.

use regex::Regex;
use std::sync::LazyLock;

/// ISO-8601 / Docker / Python logging style:
/// `2025-05-09T00:16:16.278363799Z`, `2025-05-09 00:16:16,123`, `2025-05-09 00:16:16 UTC`.
static ISO_8601: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|\s?UTC|[+-]\d{2}:?\d{2})?[:\s-]*",
    )
    .unwrap()
});

/// `date(1)` / syslog style: `Fri May 9 00:16:16 UTC 2025:`.
static SYSLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{3}\s+[A-Za-z]{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}(?:\s+UTC)?\s+\d{4}[:\s-]*")
        .unwrap()
});

/// A recogniser for one timestamp format.
pub trait TimestampPattern: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return the remainder of `line` if it starts with this timestamp format.
    fn strip<'a>(&self, line: &'a str) -> Option<&'a str>;
}

/// Timestamp pattern backed by an anchored regex.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    name: String,
    regex: Regex,
}

impl RegexPattern {
    /// Build a pattern; the regex should be anchored with `^`.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: Regex::new(pattern)?,
        })
    }

    fn from_static(name: &str, regex: &Regex) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.clone(),
        }
    }
}

impl TimestampPattern for RegexPattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex
            .find(line)
            .filter(|m| m.start() == 0 && !m.is_empty())
            .map(|m| &line[m.end()..])
    }
}

/// Ordered list of timestamp patterns.
pub struct Normalizer {
    patterns: Vec<Box<dyn TimestampPattern>>,
}

impl Normalizer {
    /// Normalizer with the built-in ISO-8601 and syslog patterns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Box::new(RegexPattern::from_static("iso8601", &ISO_8601)),
                Box::new(RegexPattern::from_static("syslog", &SYSLOG)),
            ],
        }
    }

    /// Normalizer with exactly the given patterns.
    #[must_use]
    pub fn with_patterns(patterns: Vec<Box<dyn TimestampPattern>>) -> Self {
        Self { patterns }
    }

    /// Append a pattern; it is tried after the existing ones.
    pub fn push(&mut self, pattern: Box<dyn TimestampPattern>) {
        self.patterns.push(pattern);
    }

    /// Strip a leading timestamp and surrounding whitespace.
    #[must_use]
    pub fn normalize(&self, line: &str) -> String {
        let trimmed = line.trim();
        self.patterns
            .iter()
            .find_map(|p| p.strip(trimmed))
            .unwrap_or(trimmed)
            .trim()
            .to_string()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.patterns.iter().map(|p| p.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_iso_prefixes() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("2025-05-09T00:16:16Z ERROR disk full"), "ERROR disk full");
        assert_eq!(
            n.normalize("2025-05-09 00:16:16,123 ERROR disk full"),
            "ERROR disk full"
        );
        assert_eq!(
            n.normalize("2025-05-09T00:16:16.278363799Z ERROR disk full"),
            "ERROR disk full"
        );
        assert_eq!(
            n.normalize("2025-05-09 00:16:16 UTC - ERROR disk full"),
            "ERROR disk full"
        );
        assert_eq!(
            n.normalize("2025-05-09T00:16:16+02:00 ERROR disk full"),
            "ERROR disk full"
        );
    }

    #[test]
    fn test_strips_syslog_prefix() {
        let n = Normalizer::new();
        assert_eq!(
            n.normalize("Fri May 9 00:16:16 UTC 2025: ERROR disk full"),
            "ERROR disk full"
        );
        assert_eq!(
            n.normalize("Fri May  9 00:16:16 2025 ERROR disk full"),
            "ERROR disk full"
        );
    }

    #[test]
    fn test_leaves_unprefixed_lines_trimmed() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("  ERROR disk full \n"), "ERROR disk full");
        assert_eq!(n.normalize("2025-05-09 was a Friday"), "2025-05-09 was a Friday");
        assert_eq!(n.normalize("ERROR at 2025-05-09T00:16:16Z"), "ERROR at 2025-05-09T00:16:16Z");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn test_custom_pattern_runs_after_builtins() {
        let mut n = Normalizer::new();
        n.push(Box::new(
            RegexPattern::new("epoch", r"^\[\d{10}\]\s*").unwrap(),
        ));
        assert_eq!(n.normalize("[1746749776] ERROR disk full"), "ERROR disk full");
        assert_eq!(n.normalize("2025-05-09T00:16:16Z ERROR"), "ERROR");
    }
}
