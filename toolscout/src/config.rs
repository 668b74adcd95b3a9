use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cap on returned matches.
pub const DEFAULT_MAX_RESULTS: usize = 1000;
/// Default read buffer for the per-file scanner.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Options that shape a single content search.
///
/// # Configuration Locations
///
/// Defaults can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.toolscout.yaml` in the current directory
/// 3. Global `$HOME/.config/toolscout/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Case-insensitive matching
/// ignore_case: true
///
/// # Only scan files whose base name matches this glob
/// file_pattern: "*.rs"
///
/// # Lines of leading context per match
/// context_lines: 2
///
/// # Stop after this many matches (0 = unlimited)
/// max_results: 500
///
/// # Worker count (default: CPU cores)
/// thread_count: 4
///
/// # Give up after this many milliseconds
/// timeout_ms: 2000
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// Command-line values take precedence over file values; see
/// [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Fold case when matching
    #[serde(default)]
    pub ignore_case: bool,

    /// Glob applied to each file's base name (e.g. `*.go`).
    /// If None, every file is a candidate
    #[serde(default)]
    pub file_pattern: Option<String>,

    /// Number of lines preceding each match to attach as context
    #[serde(default)]
    pub context_lines: usize,

    /// Maximum number of matches to return; 0 disables the cap
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Number of scan workers.
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Scan dotfiles and descend into dot-directories
    #[serde(default)]
    pub include_hidden: bool,

    /// Overall time budget in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Prune the walk with `.gitignore`, `.ignore` and git exclude files
    #[serde(default)]
    pub respect_gitignore: bool,

    /// Capacity of the scanner's read buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Use substring search for patterns without regex metacharacters
    #[serde(default = "default_true")]
    pub literal_fast_path: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ignore_case: false,
            file_pattern: None,
            context_lines: 0,
            max_results: default_max_results(),
            thread_count: default_thread_count(),
            include_hidden: false,
            timeout_ms: None,
            respect_gitignore: false,
            buffer_size: default_buffer_size(),
            literal_fast_path: true,
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file, layered over the default
    /// locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("toolscout/config.yaml")),
            Some(PathBuf::from(".toolscout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: SearchConfig) -> Self {
        let defaults = SearchConfig::default();

        if cli.ignore_case {
            self.ignore_case = true;
        }
        if cli.file_pattern.is_some() {
            self.file_pattern = cli.file_pattern;
        }
        if cli.context_lines != defaults.context_lines {
            self.context_lines = cli.context_lines;
        }
        if cli.max_results != defaults.max_results {
            self.max_results = cli.max_results;
        }
        if cli.thread_count != defaults.thread_count {
            self.thread_count = cli.thread_count;
        }
        if cli.include_hidden {
            self.include_hidden = true;
        }
        if cli.timeout_ms.is_some() {
            self.timeout_ms = cli.timeout_ms;
        }
        if cli.respect_gitignore {
            self.respect_gitignore = true;
        }
        if cli.buffer_size != defaults.buffer_size {
            self.buffer_size = cli.buffer_size;
        }
        if !cli.literal_fast_path {
            self.literal_fast_path = false;
        }
        if cli.log_level != defaults.log_level {
            self.log_level = cli.log_level;
        }
        self
    }

    /// The configured time budget, if any. A zero budget counts as none.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// The effective match cap, `None` when unlimited.
    pub fn result_limit(&self) -> Option<usize> {
        (self.max_results > 0).then_some(self.max_results)
    }

    pub fn with_ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = Some(pattern.into());
        self
    }

    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Sets the worker count; zero falls back to one worker.
    pub fn with_threads(mut self, workers: usize) -> Self {
        self.thread_count = NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn with_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn with_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }
}

/// A single search invocation: what to look for, where, and how.
///
/// Built per call and never mutated once the search starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub root_path: PathBuf,
    pub pattern: String,
    #[serde(default)]
    pub config: SearchConfig,
}

impl SearchRequest {
    pub fn new(root_path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            pattern: pattern.into(),
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }
}
