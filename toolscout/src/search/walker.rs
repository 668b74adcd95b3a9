use crossbeam_channel::{select, Sender};
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::filters::FileClassifier;

/// Summary of one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Paths handed to the work queue
    pub enqueued: u64,
    /// Entries the walker could not read
    pub errors: u64,
    /// The walk stopped early (cancellation or every worker gone)
    pub stopped_early: bool,
}

/// Enumerates scan candidates under a root and feeds them to the work queue.
#[derive(Debug)]
pub struct DirectoryWalker<'a> {
    root: &'a Path,
    classifier: &'a FileClassifier,
    respect_gitignore: bool,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(root: &'a Path, classifier: &'a FileClassifier, respect_gitignore: bool) -> Self {
        Self {
            root,
            classifier,
            respect_gitignore,
        }
    }

    fn builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(self.root);
        builder
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .require_git(false);

        if self.respect_gitignore {
            builder
                .ignore(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .parents(true);
        }

        let classifier = self.classifier.clone();
        builder.filter_entry(move |entry| {
            // The root is always walked, even if it is itself a dot-directory
            if entry.depth() == 0 || !is_dir(entry) {
                return true;
            }
            let keep = classifier.should_descend(&entry.file_name().to_string_lossy());
            if !keep {
                trace!("Pruning hidden directory: {}", entry.path().display());
            }
            keep
        });
        builder
    }

    /// Walks the tree, sending each scan candidate exactly once.
    ///
    /// Takes the sender by value: the queue closes when this returns, which is
    /// the workers' signal that no more paths are coming.
    pub fn walk(&self, token: &CancellationToken, queue: Sender<PathBuf>) -> WalkSummary {
        let signals = token.signals();
        let mut summary = WalkSummary::default();

        for result in self.builder().build() {
            if token.is_cancelled() {
                summary.stopped_early = true;
                break;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    summary.errors += 1;
                    continue;
                }
            };

            let file_name = entry.file_name().to_string_lossy();
            if self.classifier.should_skip(entry.path(), is_dir(&entry), &file_name) {
                continue;
            }

            let path = entry.into_path();
            let sent = select! {
                send(queue, path) -> res => res.is_ok(),
                recv(signals.cancelled) -> _ => false,
                recv(signals.deadline) -> _ => false,
            };
            if !sent {
                summary.stopped_early = true;
                break;
            }
            summary.enqueued += 1;
        }

        debug!(
            "Walk of {} finished: {} files queued, {} errors{}",
            self.root.display(),
            summary.enqueued,
            summary.errors,
            if summary.stopped_early { " (stopped early)" } else { "" }
        );
        summary
    }
}

fn is_dir(entry: &DirEntry) -> bool {
    entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false)
}
