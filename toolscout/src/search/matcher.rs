use regex::Regex;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

/// Characters that make a pattern a regular expression. A backslash counts
/// too, so an escaped plain character still goes through the regex engine.
const REGEX_META: [char; 14] = [
    '.', '*', '+', '?', '^', '$', '(', ')', '[', ']', '{', '}', '|', '\\',
];

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Substring search. With `ascii_fold`, both needle and haystack are
    /// ASCII-lowercased so byte offsets line up with the unfolded line.
    Literal { needle: String, ascii_fold: bool },
    Regex(Regex),
}

/// Compiled matcher, built once per search and shared read-only by workers.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    strategy: MatchStrategy,
}

impl PatternMatcher {
    /// Compiles `pattern`, choosing substring search when it has no regex
    /// metacharacters.
    pub fn new(pattern: &str, ignore_case: bool) -> SearchResult<Self> {
        Self::with_literal_fast_path(pattern, ignore_case, true)
    }

    /// Like [`PatternMatcher::new`]; with `fast_path` off every pattern is
    /// compiled as a regex.
    pub fn with_literal_fast_path(
        pattern: &str,
        ignore_case: bool,
        fast_path: bool,
    ) -> SearchResult<Self> {
        let literal = fast_path && Self::is_literal_pattern(pattern);

        let strategy = if literal && (!ignore_case || pattern.is_ascii()) {
            debug!("Pattern '{}' uses literal search", pattern);
            MatchStrategy::Literal {
                needle: if ignore_case {
                    pattern.to_ascii_lowercase()
                } else {
                    pattern.to_string()
                },
                ascii_fold: ignore_case,
            }
        } else {
            // Non-ASCII literals folded for case need Unicode-aware matching,
            // which only the regex engine gives with stable offsets.
            let source = if literal {
                regex::escape(pattern)
            } else {
                pattern.to_string()
            };
            let source = if ignore_case {
                format!("(?i){}", source)
            } else {
                source
            };
            debug!("Compiling regex pattern: {}", source);
            let regex = Regex::new(&source)
                .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
            MatchStrategy::Regex(regex)
        };

        Ok(Self { strategy })
    }

    /// True if the pattern contains none of the regex metacharacters
    pub fn is_literal_pattern(pattern: &str) -> bool {
        !pattern.contains(REGEX_META)
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.strategy, MatchStrategy::Literal { .. })
    }

    /// Byte offset of the first match in `line`, if any.
    ///
    /// `scratch` is caller-owned space for the case-folded line so the hot
    /// loop does not allocate per line.
    pub fn find_in(&self, line: &str, scratch: &mut String) -> Option<usize> {
        match &self.strategy {
            MatchStrategy::Literal {
                needle,
                ascii_fold: false,
            } => line.find(needle.as_str()),
            MatchStrategy::Literal {
                needle,
                ascii_fold: true,
            } => {
                scratch.clear();
                scratch.push_str(line);
                scratch.make_ascii_lowercase();
                scratch.find(needle.as_str())
            }
            MatchStrategy::Regex(regex) => regex.find(line).map(|m| m.start()),
        }
    }

    /// Convenience wrapper around [`PatternMatcher::find_in`].
    pub fn find(&self, line: &str) -> Option<usize> {
        self.find_in(line, &mut String::new())
    }
}
