//! Exclusion rules for walked entries.
//!
//! Two pattern kinds are supported and may be mixed:
//!
//! - Regular expressions (`--exclude`), matched anywhere in the entry name.
//! - Gitignore-style globs (`--ignore`), matched against the entry name via
//!   the `ignore` crate. A trailing `/` restricts a glob to directories.
//!
//! Excluded directories are never descended into by the walker.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use regex::Regex;

/// Decides whether an entry name is excluded from a walk.
pub trait Matcher {
    /// Whether a file with this name is excluded.
    fn is_excluded(&self, file_name: &str) -> bool;

    /// Whether a directory with this name is excluded.
    fn is_excluded_dir(&self, dir_name: &str) -> bool {
        self.is_excluded(dir_name)
    }
}

/// Errors raised while compiling exclude patterns.
#[derive(thiserror::Error, Debug)]
pub enum MatcherError {
    /// A regular expression failed to compile.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    Regex {
        /// The offending pattern
        pattern: String,
        /// The regex compilation error
        #[source]
        source: regex::Error,
    },

    /// A glob could not be added to the matcher.
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    Glob {
        /// The offending pattern
        pattern: String,
        /// The underlying ignore error
        #[source]
        source: ignore::Error,
    },
}

/// Regex and glob based [`Matcher`].
#[derive(Debug, Clone, Default)]
pub struct ExcludeMatcher {
    regexes: Vec<Regex>,
    globs: Option<Gitignore>,
}

impl ExcludeMatcher {
    /// A matcher that excludes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matcher from regex and glob pattern lists.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError`] for the first pattern that fails to compile.
    pub fn from_patterns(regexes: &[String], globs: &[String]) -> Result<Self, MatcherError> {
        let regexes = regexes
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| MatcherError::Regex {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let globs = if globs.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new("/");
            for pattern in globs {
                builder
                    .add_line(None, pattern)
                    .map_err(|source| MatcherError::Glob {
                        pattern: pattern.clone(),
                        source,
                    })?;
            }
            let gitignore = builder.build().map_err(|source| MatcherError::Glob {
                pattern: globs.join(", "),
                source,
            })?;
            Some(gitignore)
        };

        Ok(Self { regexes, globs })
    }

    /// True when no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty() && self.globs.as_ref().map_or(true, Gitignore::is_empty)
    }

    fn matches(&self, name: &str, is_dir: bool) -> bool {
        if self.regexes.iter().any(|re| re.is_match(name)) {
            return true;
        }
        self.globs
            .as_ref()
            .is_some_and(|gi| gi.matched(name, is_dir).is_ignore())
    }
}

impl Matcher for ExcludeMatcher {
    fn is_excluded(&self, file_name: &str) -> bool {
        self.matches(file_name, false)
    }

    fn is_excluded_dir(&self, dir_name: &str) -> bool {
        self.matches(dir_name, true)
    }
}
