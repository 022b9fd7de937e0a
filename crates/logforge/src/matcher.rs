//! Keyword matching against raw log lines.
//!
//! Keywords are literal, case-sensitive substrings. Empty keywords are
//! ignored so a stray blank entry in the config cannot match every line.

/// True if `line` contains at least one keyword.
pub fn matches<S: AsRef<str>>(line: &str, keywords: &[S]) -> bool {
    keywords
        .iter()
        .map(AsRef::as_ref)
        .any(|k| !k.is_empty() && line.contains(k))
}

/// First line that matches any keyword.
pub fn first_match<'a, L, S>(lines: &'a [L], keywords: &[S]) -> Option<&'a str>
where
    L: AsRef<str>,
    S: AsRef<str>,
{
    lines
        .iter()
        .map(AsRef::as_ref)
        .find(|line| matches(line, keywords))
}

/// Every line that matches any keyword, in order.
pub fn filter_lines<'a, L, S>(lines: &'a [L], keywords: &[S]) -> Vec<&'a str>
where
    L: AsRef<str>,
    S: AsRef<str>,
{
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| matches(line, keywords))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_case_sensitive_substring() {
        let keywords = ["ERROR", "panic"];
        assert!(matches("2025-05-09 ERROR disk full", &keywords));
        assert!(matches("thread main panicked", &keywords));
        assert!(!matches("error: lowercase", &keywords));
        assert!(!matches("all good", &keywords));
    }

    #[test]
    fn test_empty_keywords_never_match() {
        assert!(!matches("anything", &[""]));
        assert!(!matches::<&str>("anything", &[]));
    }

    #[test]
    fn test_first_match_and_filter() {
        let lines = vec![
            "INFO start".to_string(),
            "WARN slow".to_string(),
            "ERROR one".to_string(),
            "ERROR two".to_string(),
        ];
        let keywords = vec!["ERROR".to_string()];
        assert_eq!(first_match(&lines, &keywords), Some("ERROR one"));
        assert_eq!(filter_lines(&lines, &keywords), vec!["ERROR one", "ERROR two"]);
        assert_eq!(first_match(&lines, &["FATAL"]), None);
    }
}
