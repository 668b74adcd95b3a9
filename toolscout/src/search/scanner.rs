use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::trace;

use super::matcher::PatternMatcher;
use super::pool::ResultBudget;
use crate::cancel::CancellationToken;
use crate::errors::{SearchError, SearchResult};
use crate::results::Match;

/// How a single file scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Read to end of file
    Complete,
    /// The cancellation token tripped mid-file; matches are partial
    Cancelled,
    /// The shared result cap was reached mid-file
    BudgetExhausted,
}

/// Output of scanning one file
#[derive(Debug, Clone)]
pub struct FileScan {
    /// Matches in line order
    pub matches: Vec<Match>,
    /// Bytes consumed, line terminators included
    pub bytes_read: u64,
    pub status: ScanStatus,
}

/// Scans files line by line against a shared matcher.
///
/// Every call owns its reader, line buffer and context window, so one
/// `FileScanner` can be used from any number of workers at once.
#[derive(Debug)]
pub struct FileScanner<'a> {
    matcher: &'a PatternMatcher,
    context_lines: usize,
    buffer_size: usize,
}

impl<'a> FileScanner<'a> {
    pub fn new(matcher: &'a PatternMatcher, context_lines: usize, buffer_size: usize) -> Self {
        Self {
            matcher,
            context_lines,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Scans `path`.
    ///
    /// Cancellation is checked before every line and yields the matches found
    /// so far with [`ScanStatus::Cancelled`]. Open and read failures are
    /// returned as errors; the caller drops the file.
    pub fn scan(
        &self,
        path: &Path,
        token: &CancellationToken,
        budget: &ResultBudget,
    ) -> SearchResult<FileScan> {
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);

        let mut matches = Vec::new();
        let mut bytes_read = 0u64;
        let mut line_number = 0usize;
        let mut raw = Vec::with_capacity(256);
        let mut folded = String::new();
        // Grows with the lines actually read; the configured count is only a bound
        let mut window: VecDeque<String> = VecDeque::new();

        loop {
            if token.is_cancelled() {
                return Ok(FileScan {
                    matches,
                    bytes_read,
                    status: ScanStatus::Cancelled,
                });
            }

            raw.clear();
            let n = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| SearchError::from_io(path, e))?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;
            line_number += 1;

            let line = String::from_utf8_lossy(trim_line_ending(&raw));

            if let Some(start) = self.matcher.find_in(&line, &mut folded) {
                // Matches already held by this scan count against the cap too
                if budget.remaining().is_some_and(|left| matches.len() >= left) {
                    return Ok(FileScan {
                        matches,
                        bytes_read,
                        status: ScanStatus::BudgetExhausted,
                    });
                }
                matches.push(Match {
                    file: path.to_path_buf(),
                    line: line_number,
                    column: start + 1,
                    content: line.to_string(),
                    context: window.iter().cloned().collect(),
                });
            }

            if self.context_lines > 0 {
                // Recycle the oldest slot's allocation once the window is full
                let mut slot = if window.len() == self.context_lines {
                    window.pop_front().unwrap_or_default()
                } else {
                    String::new()
                };
                slot.clear();
                slot.push_str(&line);
                window.push_back(slot);
            }
        }

        trace!("Found {} matches in file {}", matches.len(), path.display());
        Ok(FileScan {
            matches,
            bytes_read,
            status: ScanStatus::Complete,
        })
    }
}

/// Strips a trailing `\n` or `\r\n`.
fn trim_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}
