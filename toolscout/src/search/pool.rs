//! Scan workers and the state they share.
//!
//! Workers pull paths from the bounded work queue, scan them, and push matches
//! onto the match stream. Apart from the two channels, the only shared
//! mutable state is a handful of atomic counters: files and bytes scanned, and
//! the result budget that caps how many matches may be emitted overall.
use crossbeam_channel::{select, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, trace};

use super::scanner::{FileScanner, ScanStatus};
use crate::cancel::CancellationToken;
use crate::results::Match;

/// Shared cap on emitted matches.
///
/// Slots are claimed before a match is pushed, so at most `limit` matches ever
/// enter the match stream no matter how many workers race for the last slot.
#[derive(Debug)]
pub struct ResultBudget {
    limit: Option<usize>,
    claimed: AtomicUsize,
}

impl ResultBudget {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            claimed: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Reserves one result slot. Returns false once the cap is reached.
    pub fn try_claim(&self) -> bool {
        match self.limit {
            None => {
                self.claimed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(limit) => self
                .claimed
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |claimed| {
                    (claimed < limit).then_some(claimed + 1)
                })
                .is_ok(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        match self.limit {
            None => false,
            Some(limit) => self.claimed.load(Ordering::Acquire) >= limit,
        }
    }

    /// Slots still free, `None` when unlimited.
    pub fn remaining(&self) -> Option<usize> {
        self.limit
            .map(|limit| limit.saturating_sub(self.claimed.load(Ordering::Acquire)))
    }

    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::Acquire)
    }
}

/// Files/bytes accounting shared by all workers
#[derive(Debug, Default)]
pub struct ScanCounters {
    files_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
}

impl ScanCounters {
    pub fn record(&self, bytes: u64, completed: bool) {
        if completed {
            self.files_scanned.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn files_scanned(&self) -> u64 {
        self.files_scanned.load(Ordering::Relaxed)
    }

    pub fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned.load(Ordering::Relaxed)
    }
}

/// Everything a worker borrows from the search that spawned it
#[derive(Debug)]
pub struct WorkerContext<'a> {
    pub scanner: &'a FileScanner<'a>,
    pub token: &'a CancellationToken,
    pub budget: &'a ResultBudget,
    pub counters: &'a ScanCounters,
}

/// Runs one worker until the queue closes, the budget is spent, the match
/// stream is dropped, or the token trips.
pub fn run_worker(
    id: usize,
    ctx: &WorkerContext<'_>,
    paths: Receiver<PathBuf>,
    matches: Sender<Match>,
) {
    let signals = ctx.token.signals();
    let mut files = 0usize;

    loop {
        // Idle workers stop claiming files once the cap is reached
        if ctx.budget.is_exhausted() || ctx.token.is_cancelled() {
            break;
        }

        let path = select! {
            recv(paths) -> path => match path {
                Ok(path) => path,
                Err(_) => break,
            },
            recv(signals.cancelled) -> _ => break,
            recv(signals.deadline) -> _ => break,
        };

        let scan = match ctx.scanner.scan(&path, ctx.token, ctx.budget) {
            Ok(scan) => scan,
            Err(e) => {
                trace!("Skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };
        files += 1;
        ctx.counters
            .record(scan.bytes_read, scan.status == ScanStatus::Complete);

        for found in scan.matches {
            if !ctx.budget.try_claim() {
                break;
            }
            let delivered = select! {
                send(matches, found) -> res => res.is_ok(),
                recv(signals.cancelled) -> _ => false,
                recv(signals.deadline) -> _ => false,
            };
            if !delivered {
                debug!("Worker {} stopping: match stream closed or cancelled", id);
                return;
            }
        }

        if scan.status == ScanStatus::Cancelled {
            break;
        }
    }

    debug!("Worker {} finished after {} files", id, files);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::matcher::PatternMatcher;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_budget_caps_claims() {
        let budget = ResultBudget::new(Some(2));
        assert!(!budget.is_exhausted());
        assert!(budget.try_claim());
        assert!(budget.try_claim());
        assert!(!budget.try_claim());
        assert!(budget.is_exhausted());
        assert_eq!(budget.claimed(), 2);
        assert_eq!(budget.remaining(), Some(0));
        assert_eq!(ResultBudget::unlimited().remaining(), None);
    }

    #[test]
    fn test_unlimited_budget_never_exhausts() {
        let budget = ResultBudget::unlimited();
        for _ in 0..1000 {
            assert!(budget.try_claim());
        }
        assert!(!budget.is_exhausted());
    }

    #[test]
    fn test_budget_is_exact_under_contention() {
        let budget = Arc::new(ResultBudget::new(Some(100)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let budget = Arc::clone(&budget);
                thread::spawn(move || (0..50).filter(|_| budget.try_claim()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 100);
    }

    #[test]
    fn test_worker_drains_queue() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = dir.path().join(format!("f{}.txt", i));
            fs::write(&path, "needle\nhay\nneedle\n").unwrap();
            paths.push(path);
        }
        paths.push(dir.path().join("missing.txt"));

        let matcher = PatternMatcher::new("needle", false).unwrap();
        let scanner = FileScanner::new(&matcher, 0, 1024);
        let token = CancellationToken::new();
        let budget = ResultBudget::unlimited();
        let counters = ScanCounters::default();
        let ctx = WorkerContext {
            scanner: &scanner,
            token: &token,
            budget: &budget,
            counters: &counters,
        };

        let (path_tx, path_rx) = crossbeam_channel::unbounded();
        let (match_tx, match_rx) = crossbeam_channel::unbounded();
        for path in paths {
            path_tx.send(path).unwrap();
        }
        drop(path_tx);

        run_worker(0, &ctx, path_rx, match_tx);

        assert_eq!(match_rx.iter().count(), 6);
        assert_eq!(counters.files_scanned(), 3);
        assert_eq!(counters.bytes_scanned(), 3 * 18);
    }

    #[test]
    fn test_worker_respects_budget() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("many.txt");
        fs::write(&path, "x\n".repeat(10)).unwrap();

        let matcher = PatternMatcher::new("x", false).unwrap();
        let scanner = FileScanner::new(&matcher, 0, 1024);
        let token = CancellationToken::new();
        let budget = ResultBudget::new(Some(4));
        let counters = ScanCounters::default();
        let ctx = WorkerContext {
            scanner: &scanner,
            token: &token,
            budget: &budget,
            counters: &counters,
        };

        let (path_tx, path_rx) = crossbeam_channel::unbounded();
        let (match_tx, match_rx) = crossbeam_channel::unbounded();
        path_tx.send(path.clone()).unwrap();
        path_tx.send(path).unwrap();
        drop(path_tx);

        run_worker(0, &ctx, path_rx, match_tx);
        assert_eq!(match_rx.iter().count(), 4);
    }
}
