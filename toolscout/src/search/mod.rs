//! Concurrent content search.
//!
//! A search runs as a small pipeline:
//!
//! 1. [`walker::DirectoryWalker`] enumerates candidate files on its own thread
//!    and feeds a bounded work queue.
//! 2. A fixed pool of workers ([`pool::run_worker`]) pulls paths off the queue
//!    and scans each one with [`scanner::FileScanner`].
//! 3. Matches flow through a second bounded channel to the aggregator in
//!    [`engine`], which caps, sorts, and returns them.
//!
//! All three stages watch the same [`crate::cancel::CancellationToken`], so a
//! timeout or an external cancel stops the whole pipeline promptly and still
//! returns whatever was found.
//!
//! ```rust,no_run
//! use toolscout::{find, SearchConfig};
//!
//! let output = find(r"func\s+\w+\(", ".", SearchConfig::default().with_context_lines(2))?;
//! for m in &output.matches {
//!     println!("{}:{}:{}", m.file.display(), m.line, m.content);
//! }
//! # Ok::<(), toolscout::SearchError>(())
//! ```
pub mod engine;
pub mod matcher;
pub mod pool;
pub mod scanner;
pub mod walker;

pub use engine::{find, search, SearchEngine};
pub use matcher::{MatchStrategy, PatternMatcher};
pub use scanner::{FileScan, FileScanner, ScanStatus};
pub use walker::{DirectoryWalker, WalkSummary};
