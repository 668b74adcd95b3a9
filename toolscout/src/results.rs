/// Search result types.
///
/// A [`Match`] is produced by the per-file scanner and handed over to the
/// aggregator through the match stream; the aggregator owns it from then on.
/// [`SearchOutput`] is the terminal, read-only artifact returned to callers.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// A single matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// The file containing the match
    pub file: PathBuf,
    /// 1-indexed line number
    pub line: usize,
    /// 1-indexed byte column of the first match on the line
    pub column: usize,
    /// The full text of the matched line, without its line terminator
    pub content: String,
    /// Lines immediately preceding the match, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl Match {
    /// Orders by file path, then line number
    pub fn cmp_position(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then_with(|| self.line.cmp(&other.line))
            .then_with(|| self.column.cmp(&other.column))
    }
}

/// Work accounting for one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Wall-clock time from search start to aggregation completion
    pub duration: Duration,
    /// Files whose scan ran to the end
    pub files_scanned: u64,
    /// Bytes read across all scans, partial ones included
    pub bytes_scanned: u64,
    /// Matches in the returned result
    pub matches_found: usize,
}

/// How the search ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Every discovered file was scanned or the result cap was reached
    #[default]
    Finished,
    /// The time budget ran out
    TimedOut,
    /// The caller cancelled the search
    Cancelled,
}

/// The complete search results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutput {
    /// Matches ordered by (file, line)
    pub matches: Vec<Match>,
    pub stats: SearchStats,
    pub completion: Completion,
}

impl SearchOutput {
    /// Creates a new empty search result
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of matches
    pub fn count(&self) -> usize {
        self.matches.len()
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Sorted, de-duplicated list of files that contain matches
    pub fn files(&self) -> Vec<PathBuf> {
        self.matches
            .iter()
            .map(|m| m.file.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn timed_out(&self) -> bool {
        self.completion == Completion::TimedOut
    }
}

/// Sorts matches into their deterministic order and applies the cap
pub fn finalize_matches(mut matches: Vec<Match>, limit: Option<usize>) -> Vec<Match> {
    matches.sort_by(Match::cmp_position);
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
    matches
}
