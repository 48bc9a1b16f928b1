//! Expected-output comparison for transcript statements

use serde::{Deserialize, Serialize};

/// Wildcard accepted inside expected output when [`MatchOptions::ellipsis`] is on
pub const ELLIPSIS: &str = "...";

/// Relaxations of the exact-text comparison. Both are off by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// `...` in the expected text matches any substring
    pub ellipsis: bool,
    /// Any run of whitespace compares equal to a single space
    pub normalize_whitespace: bool,
}

/// Canonical form: trailing whitespace of each line and trailing blank
/// lines never count.
pub fn canonical(text: &str, options: MatchOptions) -> String {
    if options.normalize_whitespace {
        return text.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Whether `actual` satisfies `expected`
pub fn output_matches(actual: &str, expected: &str, options: MatchOptions) -> bool {
    let actual = canonical(actual, options);
    let expected = canonical(expected, options);
    if actual == expected {
        return true;
    }
    options.ellipsis && ellipsis_match(&expected, &actual)
}

fn ellipsis_match(pattern: &str, text: &str) -> bool {
    let pieces: Vec<&str> = pattern.split(ELLIPSIS).collect();
    let [first, middle @ .., last] = pieces.as_slice() else {
        return pattern == text;
    };

    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let Some(inner) = rest.strip_suffix(last) else {
        return false;
    };
    rest = inner;

    for piece in middle {
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXACT: MatchOptions = MatchOptions {
        ellipsis: false,
        normalize_whitespace: false,
    };

    #[test]
    fn test_exact_ignores_trailing_whitespace() {
        assert!(output_matches("3  \n\n", "3", EXACT));
        assert!(!output_matches("3", "4", EXACT));
        assert!(!output_matches("a  b", "a b", EXACT));
    }

    #[test]
    fn test_ellipsis() {
        let options = MatchOptions {
            ellipsis: true,
            ..EXACT
        };
        assert!(output_matches("[0, 1, 2, 3, 4]", "[0, 1, ..., 4]", options));
        assert!(output_matches("anything", "...", options));
        assert!(!output_matches("[0, 1]", "[0, ..., 1, 1]", options));
        assert!(!output_matches("ab", "ab...ab", options));
        assert!(!output_matches("[0, 1, 2]", "[0, 1, ...]", EXACT));
    }

    #[test]
    fn test_normalize_whitespace() {
        let options = MatchOptions {
            normalize_whitespace: true,
            ..EXACT
        };
        assert!(output_matches("a   b\nc", "a b c", options));
    }
}
