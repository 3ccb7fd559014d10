//! Glob pattern sets matched against full relative paths.

use glob::{MatchOptions, Pattern};

use gbampy_core::error::{GbaError, Result};

/// `*` stays within one component, `**` spans directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled set of ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|e| GbaError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether any pattern matches the whole of `relative`.
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path_match() {
        let set = IgnoreSet::new(&["a/b/*.py"]).unwrap();
        assert!(set.matches("a/b/c.py"));
        assert!(!set.matches("a/b/c/d.py"));
        assert!(!set.matches("x/a/b/c.py"));
        assert!(!set.matches("a/b/c.pyc"));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let set = IgnoreSet::new(&["*.txt"]).unwrap();
        assert!(set.matches("notes.txt"));
        assert!(!set.matches("docs/notes.txt"));
    }

    #[test]
    fn test_double_star() {
        let set = IgnoreSet::new(&["**/__pycache__"]).unwrap();
        assert!(set.matches("lib/__pycache__"));
        assert!(set.matches("lib/vendor/__pycache__"));
    }

    #[test]
    fn test_not_substring() {
        let set = IgnoreSet::new(&["test"]).unwrap();
        assert!(set.matches("test"));
        assert!(!set.matches("tests"));
        assert!(!set.matches("lib/test"));
    }

    #[test]
    fn test_hidden_files_match_star() {
        let set = IgnoreSet::new(&["*"]).unwrap();
        assert!(set.matches(".gbampy.toml"));
    }

    #[test]
    fn test_empty_set() {
        let set = IgnoreSet::new::<&str>(&[]).unwrap();
        assert!(set.is_empty());
        assert!(!set.matches("anything"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = IgnoreSet::new(&["a/[b"]).unwrap_err();
        match err {
            GbaError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "a/[b"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
