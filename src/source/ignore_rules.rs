//! `.overlayignore` rules in gitignore syntax.

use std::fmt;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::Result;

/// Name of the ignore file read from the root of a source.
pub const IGNORE_FILE: &str = ".overlayignore";

/// Compiled ignore patterns, matched against source-relative paths.
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    /// Compile gitignore-syntax `text`. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut builder = GitignoreBuilder::new("");
        for line in text.lines() {
            builder.add_line(None, line)?;
        }
        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// Whether `path` or one of its parent folders is ignored.
    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }

    pub fn len(&self) -> usize {
        self.matcher.num_ignores() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("patterns", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        let rules = IgnoreRules::parse("# comment\n\n*.psd\nGraphics/Unused/\n!keep.psd\n").unwrap();
        assert!(rules.is_ignored("art.psd", false));
        assert!(rules.is_ignored("Graphics/art.psd", false));
        assert!(!rules.is_ignored("keep.psd", false));
        assert!(rules.is_ignored("Graphics/Unused/a.png", false));
        assert!(rules.is_ignored("Graphics/Unused", true));
        assert!(!rules.is_ignored("Graphics/a.png", false));
    }

    #[test]
    fn test_empty() {
        let rules = IgnoreRules::parse("").unwrap();
        assert!(rules.is_empty());
        assert!(!rules.is_ignored("a.png", false));
    }
}
