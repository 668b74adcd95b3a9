//! Concurrent, cancellable content search over directory trees.
//!
//! The entry points are [`search`] and [`find`], or [`SearchEngine`] when the
//! caller wants to supply its own [`CancellationToken`]. The [`tools`] module
//! wraps the engine in the string-in, string-out handlers used by tool
//! integrations.
pub mod cancel;
pub mod config;
pub mod errors;
pub mod filters;
pub mod results;
pub mod search;
pub mod tools;

pub use cancel::{CancelReason, CancellationToken};
pub use config::{SearchConfig, SearchRequest};
pub use errors::{SearchError, SearchResult};
pub use results::{Completion, Match, SearchOutput, SearchStats};
pub use search::{find, search, SearchEngine};
