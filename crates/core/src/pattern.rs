//! SQL `LIKE` style matching used to discover template assets by name.

use regex::Regex;

use crate::error::{Error, Result};

/// Translate a `LIKE` pattern into a regular expression.
///
/// `%` becomes `.*` and `_` becomes `.`; all other characters are passed
/// through unchanged. The expression is anchored at the start only.
pub fn like_to_regex(pattern: &str) -> Result<Regex> {
    let translated = pattern.replace('%', ".*").replace('_', ".");
    Regex::new(&format!("^(?:{})", translated)).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Whether `text` matches the `LIKE` pattern (case-sensitive).
pub fn like_operator(pattern: &str, text: &str) -> Result<bool> {
    Ok(like_to_regex(pattern)?.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_operator_contains() {
        assert!(like_operator("%ogo%", "company_logo").unwrap());
        assert!(like_operator("%ogo%", "Logo").unwrap());
        assert!(!like_operator("%ogo%", "banner").unwrap());
    }

    #[test]
    fn test_like_operator_is_case_sensitive() {
        assert!(!like_operator("%ogo%", "LOGO").unwrap());
    }

    #[test]
    fn test_like_operator_single_char_wildcard() {
        assert!(like_operator("l_go", "logo").unwrap());
        assert!(!like_operator("l_go", "lgo").unwrap());
    }

    #[test]
    fn test_like_operator_anchored_at_start_only() {
        // Same as a prefix match: trailing text is allowed.
        assert!(like_operator("log", "logo_final").unwrap());
        assert!(!like_operator("log", "my_logo").unwrap());
    }

    #[test]
    fn test_like_operator_invalid_pattern() {
        assert!(matches!(
            like_operator("(%", "x"),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
