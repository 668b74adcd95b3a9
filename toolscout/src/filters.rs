/// File classification for the content search.
///
/// Decides, per walked entry, whether a path is worth scanning:
///
/// 1. Directories are never scanned (they are only walked into).
/// 2. Dotfiles are skipped unless hidden files are included; a skipped
///    dot-directory prunes its whole subtree (see [`FileClassifier::should_descend`]).
/// 3. Known binary extensions are skipped without touching the file.
/// 4. The optional glob is matched against the base name.
/// 5. Everything left gets a cheap content sniff: a NUL byte in the first
///    512 bytes marks the file as binary. An unreadable file counts as binary.
///
/// The glob runs before the sniff so filtered-out files are never opened.
use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::trace;

use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};

/// Number of leading bytes inspected by the binary sniff.
pub const SNIFF_LEN: usize = 512;

static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // compiled objects and libraries
        "exe", "dll", "so", "dylib", "bin", "obj", "o", "a", "lib", "class", "jar", "war", "ear",
        "pyc", "wasm", // images
        "jpg", "jpeg", "png", "gif", "bmp", "ico", "tif", "tiff", "webp", "pdf",
        // archives
        "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "zst", // audio and video
        "mp3", "mp4", "avi", "mov", "mkv", "wav", "flac", "ogg", "webm",
    ]
    .into_iter()
    .collect()
});

/// Checks the extension deny-list
pub fn is_likely_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| BINARY_EXTENSIONS.contains(ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reads up to [`SNIFF_LEN`] bytes and looks for a NUL byte.
/// Any read failure classifies the file as binary.
pub fn sniff_binary(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return true,
    };

    let mut buffer = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return true,
        }
    }

    buffer[..filled].contains(&0)
}

/// Dotfile test on a base name. `.` and `..` are not hidden.
pub fn is_hidden_name(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name != "." && file_name != ".."
}

/// Per-search file classifier, built once and shared read-only by the walker.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    include_hidden: bool,
    glob: Option<Pattern>,
}

impl FileClassifier {
    /// Builds the classifier; a malformed glob is rejected up front.
    pub fn new(include_hidden: bool, file_pattern: Option<&str>) -> SearchResult<Self> {
        let glob = match file_pattern.filter(|p| !p.is_empty()) {
            Some(pattern) => Some(Pattern::new(pattern).map_err(|e| {
                SearchError::invalid_pattern(format!("file pattern '{}': {}", pattern, e))
            })?),
            None => None,
        };
        Ok(Self {
            include_hidden,
            glob,
        })
    }

    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        Self::new(config.include_hidden, config.file_pattern.as_deref())
    }

    /// Whether the walker may enter a directory with this base name.
    pub fn should_descend(&self, dir_name: &str) -> bool {
        self.include_hidden || !is_hidden_name(dir_name)
    }

    /// Glob check against a base name; no glob matches everything.
    pub fn matches_glob(&self, file_name: &str) -> bool {
        match &self.glob {
            // Unix-style: `*` and `?` do not cross separators, so patterns
            // behave like a shell match on the base name.
            Some(glob) => glob.matches_with(
                file_name,
                MatchOptions {
                    case_sensitive: true,
                    require_literal_separator: true,
                    require_literal_leading_dot: false,
                },
            ),
            None => true,
        }
    }

    /// True if the entry must not be scanned for content.
    pub fn should_skip(&self, path: &Path, is_dir: bool, file_name: &str) -> bool {
        if is_dir {
            return true;
        }

        if !self.include_hidden && is_hidden_name(file_name) {
            trace!("Skipping hidden file: {}", path.display());
            return true;
        }

        if is_likely_binary(path) {
            trace!("Skipping binary extension: {}", path.display());
            return true;
        }

        if !self.matches_glob(file_name) {
            return true;
        }

        if sniff_binary(path) {
            trace!("Skipping binary content: {}", path.display());
            return true;
        }

        false
    }
}
