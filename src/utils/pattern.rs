//! Wildcard matching for exit codes.
//!
//! `*` matches any run of characters (including none) and `?` matches exactly
//! one character. When several patterns match the same exit code the most
//! specific one wins; see [`ExitCodePattern::cmp_specificity`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A wildcard pattern over exit codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExitCodePattern(String);

impl ExitCodePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the pattern contains no wildcards
    pub fn is_exact(&self) -> bool {
        !self.0.contains(['*', '?'])
    }

    pub fn matches(&self, exit_code: &str) -> bool {
        let pattern: Vec<char> = self.0.chars().collect();
        let text: Vec<char> = exit_code.chars().collect();
        wildcard_match(&pattern, &text)
    }

    /// Order patterns from most to least specific: exact patterns first, then
    /// fewer `*`, then fewer `?`, then longer patterns. Remaining ties fall
    /// back to lexical order so sorting is deterministic.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        other
            .is_exact()
            .cmp(&self.is_exact())
            .then_with(|| self.count('*').cmp(&other.count('*')))
            .then_with(|| self.count('?').cmp(&other.count('?')))
            .then_with(|| other.0.chars().count().cmp(&self.0.chars().count()))
            .then_with(|| self.0.cmp(&other.0))
    }

    fn count(&self, wildcard: char) -> usize {
        self.0.chars().filter(|c| *c == wildcard).count()
    }
}

impl fmt::Display for ExitCodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExitCodePattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for ExitCodePattern {
    fn from(pattern: String) -> Self {
        Self(pattern)
    }
}

// Iterative matcher with single-star backtracking.
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_text = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_text = t;
            p += 1;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            star_text += 1;
            t = star_text;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
