use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::config::{SearchConfig, SearchRequest};
use crate::errors::SearchResult;
use crate::results::SearchOutput;
use crate::search::search;

/// Reply for a search that ran out of time before finding anything.
pub const TIMED_OUT_MESSAGE: &str = "Search timed out.";

/// Arguments of the `search_code` tool.
///
/// Optional fields left out (or set to zero/false) keep the configured
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCodeArgs {
    /// Directory to search
    pub path: PathBuf,
    /// Literal text or regular expression
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SearchCodeArgs {
    pub fn new(path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Layers the arguments over `defaults`.
    pub fn into_request(self, defaults: SearchConfig) -> SearchRequest {
        let mut config = defaults;

        if self.ignore_case == Some(true) {
            config = config.with_ignore_case();
        }
        if let Some(lines) = self.context_lines.filter(|n| *n > 0) {
            config = config.with_context_lines(lines);
        }
        if let Some(glob) = self.file_pattern.filter(|g| !g.is_empty()) {
            config = config.with_file_pattern(glob);
        }
        if let Some(max) = self.max_results.filter(|n| *n > 0) {
            config = config.with_max_results(max);
        }
        if self.include_hidden == Some(true) {
            config = config.with_hidden();
        }
        if let Some(ms) = self.timeout_ms.filter(|ms| *ms > 0) {
            config = config.with_timeout(Duration::from_millis(ms));
        }

        SearchRequest::new(self.path, self.pattern).with_config(config)
    }
}

/// Renders matches as `path:line:content`, each followed by its context lines
/// as `path-content`. No trailing newline; empty for no matches.
pub fn format_output(output: &SearchOutput) -> String {
    let mut rendered = String::new();
    for m in &output.matches {
        let file = m.file.display();
        let _ = writeln!(rendered, "{}:{}:{}", file, m.line, m.content);
        for line in &m.context {
            let _ = writeln!(rendered, "{}-{}", file, line);
        }
    }
    if rendered.ends_with('\n') {
        rendered.pop();
    }
    rendered
}

/// Runs a `search_code` call with default configuration underneath.
pub fn handle_search_code(args: SearchCodeArgs) -> SearchResult<String> {
    handle_search_code_with(args, SearchConfig::default())
}

/// Runs a `search_code` call over the given base configuration.
pub fn handle_search_code_with(
    args: SearchCodeArgs,
    defaults: SearchConfig,
) -> SearchResult<String> {
    info!("Handling search_code call for '{}'", args.pattern);
    let pattern = args.pattern.clone();
    let output = search(args.into_request(defaults))?;

    if output.timed_out() && !output.has_matches() {
        info!("Search for '{}' timed out", pattern);
    } else {
        info!(
            "Search for '{}' completed: {} matches, {} files scanned in {:?}",
            pattern,
            output.count(),
            output.stats.files_scanned,
            output.stats.duration
        );
    }
    Ok(render_reply(&output))
}

/// The tool reply for a finished search: the formatted matches, or
/// [`TIMED_OUT_MESSAGE`] when time ran out before anything was found.
pub fn render_reply(output: &SearchOutput) -> String {
    if output.timed_out() && !output.has_matches() {
        TIMED_OUT_MESSAGE.to_string()
    } else {
        format_output(output)
    }
}

/// Parses JSON arguments and runs [`handle_search_code`].
pub fn handle_search_code_json(args: &str) -> SearchResult<String> {
    handle_search_code(serde_json::from_str(args)?)
}
