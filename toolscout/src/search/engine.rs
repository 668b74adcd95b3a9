use crossbeam_channel::{select, Receiver};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::matcher::PatternMatcher;
use super::pool::{run_worker, ResultBudget, ScanCounters, WorkerContext};
use super::scanner::FileScanner;
use super::walker::{DirectoryWalker, WalkSummary};
use crate::cancel::{CancelReason, CancellationToken};
use crate::config::{SearchConfig, SearchRequest};
use crate::errors::SearchResult;
use crate::filters::FileClassifier;
use crate::results::{finalize_matches, Completion, Match, SearchOutput, SearchStats};

/// Paths buffered between the walker and the workers, per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 2;
/// Matches buffered between the workers and the aggregator.
const MATCH_STREAM_CAPACITY: usize = 1000;

/// A content search over one directory tree.
///
/// Construction compiles the pattern and the file glob, so a malformed
/// pattern fails here before any filesystem work. Each engine runs the
/// request it was built for; nothing is shared between engines.
#[derive(Debug)]
pub struct SearchEngine {
    request: SearchRequest,
    matcher: PatternMatcher,
    classifier: FileClassifier,
}

impl SearchEngine {
    pub fn new(request: SearchRequest) -> SearchResult<Self> {
        let config = &request.config;
        let matcher = PatternMatcher::with_literal_fast_path(
            &request.pattern,
            config.ignore_case,
            config.literal_fast_path,
        )?;
        let classifier = FileClassifier::from_config(config)?;
        Ok(Self {
            request,
            matcher,
            classifier,
        })
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Runs the search, arming the configured time budget.
    pub fn search(&self) -> SearchResult<SearchOutput> {
        let token = match self.request.config.timeout() {
            Some(timeout) => CancellationToken::with_timeout(timeout),
            None => CancellationToken::new(),
        };
        self.search_with_token(&token)
    }

    /// Runs the search under a caller-supplied token.
    ///
    /// Cancellation is not an error: whatever was found before the token
    /// tripped comes back with [`Completion::TimedOut`] or
    /// [`Completion::Cancelled`].
    pub fn search_with_token(&self, token: &CancellationToken) -> SearchResult<SearchOutput> {
        let start = Instant::now();
        let config = &self.request.config;
        let root = self.request.root_path.as_path();

        info!(
            "Starting search for '{}' in {}",
            self.request.pattern,
            root.display()
        );

        if self.request.pattern.is_empty() {
            warn!("Empty search pattern provided");
            return Ok(SearchOutput::new());
        }
        if !root.exists() {
            warn!("Search root does not exist: {}", root.display());
        }

        let workers = config.thread_count.get();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("toolscout-scan-{}", i))
            .build()?;

        let scanner = FileScanner::new(&self.matcher, config.context_lines, config.buffer_size);
        let budget = ResultBudget::new(config.result_limit());
        let counters = ScanCounters::default();
        let ctx = WorkerContext {
            scanner: &scanner,
            token,
            budget: &budget,
            counters: &counters,
        };
        let walker = DirectoryWalker::new(root, &self.classifier, config.respect_gitignore);

        let (path_tx, path_rx) =
            crossbeam_channel::bounded::<PathBuf>(workers * QUEUE_SLOTS_PER_WORKER);
        let (match_tx, match_rx) = crossbeam_channel::bounded::<Match>(MATCH_STREAM_CAPACITY);

        let collected = thread::scope(|scope| -> SearchResult<Vec<Match>> {
            let walk = thread::Builder::new()
                .name("toolscout-walker".to_string())
                .spawn_scoped(scope, move || walker.walk(token, path_tx))?;

            // The scope is the completion barrier: it returns only after every
            // worker has dropped its match sender.
            let collected = pool.in_place_scope(|workers_scope| {
                for id in 0..workers {
                    let paths = path_rx.clone();
                    let matches = match_tx.clone();
                    let ctx = &ctx;
                    workers_scope.spawn(move |_| run_worker(id, ctx, paths, matches));
                }
                drop(path_rx);
                drop(match_tx);

                aggregate(match_rx, config.result_limit(), token)
            });

            let summary = walk_outcome(walk.join());
            debug!("Walker queued {} files", summary.enqueued);
            Ok(collected)
        })?;

        let matches = finalize_matches(collected, config.result_limit());
        let completion = match token.reason() {
            Some(CancelReason::DeadlineExceeded) => Completion::TimedOut,
            Some(CancelReason::Cancelled) => Completion::Cancelled,
            None => Completion::Finished,
        };
        let stats = SearchStats {
            duration: start.elapsed(),
            files_scanned: counters.files_scanned(),
            bytes_scanned: counters.bytes_scanned(),
            matches_found: matches.len(),
        };

        info!(
            "Search complete. Found {} matches in {} files scanned ({} bytes) in {:?}{}",
            stats.matches_found,
            stats.files_scanned,
            stats.bytes_scanned,
            stats.duration,
            match completion {
                Completion::Finished => "",
                Completion::TimedOut => " (timed out)",
                Completion::Cancelled => " (cancelled)",
            }
        );

        Ok(SearchOutput {
            matches,
            stats,
            completion,
        })
    }
}

/// Drains the match stream until it closes, the cap is reached, or the token
/// trips. On cancellation whatever is already buffered is still collected.
///
/// Takes the receiver by value so the stream is dropped on return, which
/// unblocks any worker still trying to push.
fn aggregate(
    stream: Receiver<Match>,
    limit: Option<usize>,
    token: &CancellationToken,
) -> Vec<Match> {
    let signals = token.signals();
    let mut collected = Vec::new();
    let full = |collected: &Vec<Match>| limit.is_some_and(|limit| collected.len() >= limit);

    while !full(&collected) {
        select! {
            recv(stream) -> found => match found {
                Ok(found) => collected.push(found),
                Err(_) => break,
            },
            recv(signals.cancelled) -> _ => {
                debug!("Search cancelled, draining buffered matches");
                collected.extend(stream.try_iter().take(remaining(limit, collected.len())));
                break;
            },
            recv(signals.deadline) -> _ => {
                debug!("Search deadline exceeded, draining buffered matches");
                collected.extend(stream.try_iter().take(remaining(limit, collected.len())));
                break;
            },
        }
    }

    collected
}

/// A panicked walker ends discovery early; it is logged, not propagated.
fn walk_outcome(joined: thread::Result<WalkSummary>) -> WalkSummary {
    joined.unwrap_or_else(|_| {
        warn!("Walker thread panicked; file discovery ended early");
        WalkSummary {
            stopped_early: true,
            ..WalkSummary::default()
        }
    })
}

fn remaining(limit: Option<usize>, collected: usize) -> usize {
    limit.map_or(usize::MAX, |limit| limit.saturating_sub(collected))
}

/// Performs a concurrent search across files under `root`.
///
/// Builds a fresh [`SearchEngine`] for the call, so repeated calls share no
/// state.
pub fn search(request: SearchRequest) -> SearchResult<SearchOutput> {
    SearchEngine::new(request)?.search()
}

/// Shorthand for searching `root` for `pattern` with `config`.
pub fn find(
    pattern: &str,
    root: impl AsRef<Path>,
    config: SearchConfig,
) -> SearchResult<SearchOutput> {
    search(SearchRequest::new(root.as_ref(), pattern).with_config(config))
}
