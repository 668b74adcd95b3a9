use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::errors::{SearchError, SearchResult};

/// Lines shown on each side of a hit.
const CONTEXT_RADIUS: usize = 2;

/// Arguments of the `search_files` tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilesArgs {
    /// Directory to search
    pub path: PathBuf,
    /// Regular expression to look for
    pub regex: String,
    /// Glob on file base names (e.g. `*.ts`); every file when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
}

/// One regex match, with enough surroundings to read it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSearchHit {
    pub file_path: PathBuf,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed byte column
    pub column: usize,
    /// The matched text
    #[serde(rename = "match")]
    pub matched: String,
    pub line_text: String,
    /// Up to two lines either side, rendered as `"<n> | <text>"`
    pub context: String,
}

/// Reports every match of `args.regex` on every line of every file under
/// `args.path`, ordered by path, line and column.
///
/// Unlike the content search engine this applies no hidden-file or binary
/// filtering. Unreadable files are skipped.
pub fn search_files(args: &SearchFilesArgs) -> SearchResult<Vec<FileSearchHit>> {
    let regex = Regex::new(&args.regex).map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
    let glob = args
        .file_pattern
        .as_deref()
        .filter(|g| !g.is_empty())
        .map(|g| {
            Pattern::new(g)
                .map_err(|e| SearchError::invalid_pattern(format!("file pattern '{}': {}", g, e)))
        })
        .transpose()?;

    if !args.path.exists() {
        return Err(SearchError::file_not_found(&args.path));
    }

    let files = collect_files(&args.path, glob.as_ref());
    debug!("search_files: {} candidate files", files.len());

    let mut hits: Vec<FileSearchHit> = files
        .par_iter()
        .flat_map_iter(|path| scan_file(path, &regex))
        .collect();

    hits.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.column.cmp(&b.column))
    });
    Ok(hits)
}

fn collect_files(root: &Path, glob: Option<&Pattern>) -> Vec<PathBuf> {
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };

    WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| {
            glob.map_or(true, |glob| {
                glob.matches_with(&entry.file_name().to_string_lossy(), options)
            })
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn scan_file(path: &Path, regex: &Regex) -> Vec<FileSearchHit> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            trace!("Skipping unreadable file {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    // A trailing newline yields a final empty line, which anchors like `^$` can match
    let lines: Vec<&str> = content.split('\n').collect();

    let mut hits = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        for m in regex.find_iter(line) {
            hits.push(FileSearchHit {
                file_path: path.to_path_buf(),
                line: i + 1,
                column: m.start() + 1,
                matched: m.as_str().to_string(),
                line_text: line.to_string(),
                context: render_context(&lines, i),
            });
        }
    }
    hits
}

fn render_context(lines: &[&str], index: usize) -> String {
    let start = index.saturating_sub(CONTEXT_RADIUS);
    let end = (index + CONTEXT_RADIUS).min(lines.len().saturating_sub(1));
    (start..=end)
        .map(|j| format!("{} | {}", j + 1, lines[j]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs a `search_files` call and renders the hits as pretty JSON.
pub fn handle_search_files(args: &SearchFilesArgs) -> SearchResult<String> {
    info!("Handling search_files call for '{}'", args.regex);
    let hits = search_files(args)?;
    info!("search_files found {} matches", hits.len());
    Ok(serde_json::to_string_pretty(&hits)?)
}

/// Parses JSON arguments and runs [`handle_search_files`].
pub fn handle_search_files_json(args: &str) -> SearchResult<String> {
    let args: SearchFilesArgs = serde_json::from_str(args)?;
    handle_search_files(&args)
}
