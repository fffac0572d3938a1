// src/watch/patterns.rs

use std::fmt;

use globset::{Glob, GlobBuilder, GlobMatcher};
use regex::bytes::Regex;
use thiserror::Error;

/// Failure to compile one configured pattern. Always names the pattern text.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("invalid regular expression: {pattern}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob pattern: {pattern}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Syntax a pattern string was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Regex,
    Glob,
}

/// Classify a pattern string: `/…/` (length >= 2) is a regular expression,
/// anything else is a glob.
pub fn classify(pattern: &str) -> PatternKind {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        PatternKind::Regex
    } else {
        PatternKind::Glob
    }
}

/// One compiled pattern.
///
/// - `Regex` reports the first matched substring.
/// - `Glob` must match the whole line and reports the whole line.
#[derive(Clone)]
pub enum Pattern {
    Regex { source: String, regex: Regex },
    Glob { source: String, matcher: GlobMatcher },
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Regex { source, .. } => write!(f, "Regex({source:?})"),
            Pattern::Glob { source, .. } => write!(f, "Glob({source:?})"),
        }
    }
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        match classify(pattern) {
            PatternKind::Regex => {
                let regex = Regex::new(&pattern[1..pattern.len() - 1]).map_err(|source| {
                    PatternError::Regex {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                Ok(Pattern::Regex {
                    source: pattern.to_string(),
                    regex,
                })
            }
            PatternKind::Glob => {
                let glob = build_glob(pattern).map_err(|source| PatternError::Glob {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(Pattern::Glob {
                    source: pattern.to_string(),
                    matcher: glob.compile_matcher(),
                })
            }
        }
    }

    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Regex { .. } => PatternKind::Regex,
            Pattern::Glob { .. } => PatternKind::Glob,
        }
    }

    /// The pattern text as configured (including the `/` delimiters).
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Regex { source, .. } | Pattern::Glob { source, .. } => source,
        }
    }

    /// Test one line (without its terminator). Returns the matched text.
    pub fn find(&self, line: &[u8]) -> Option<String> {
        match self {
            Pattern::Regex { regex, .. } => regex
                .find(line)
                .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned()),
            Pattern::Glob { matcher, .. } => {
                let text = String::from_utf8_lossy(line);
                if matcher.is_match(&*text) {
                    Some(text.into_owned())
                } else {
                    None
                }
            }
        }
    }
}

/// Globs here match arbitrary text, not paths: `*` also crosses `/`.
fn build_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
}

/// Ordered list of compiled patterns; earlier patterns win.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile every pattern in order, failing on the first invalid one.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether any pattern is configured. With none, watchers only forward.
    pub fn is_defined(&self) -> bool {
        !self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First match across all patterns, in configured order.
    pub fn find(&self, line: &[u8]) -> Option<String> {
        self.patterns.iter().find_map(|p| p.find(line))
    }
}

/// Strip a trailing `\n` (and a `\r` before it) from a raw line.
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
