use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::{num::NonZeroUsize, path::PathBuf};
use toolscout::{
    config::{SearchConfig, SearchRequest},
    results::{Completion, SearchOutput},
    search,
    tools::{handle_search_files, render_reply, SearchFilesArgs},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliSearchConfig {
    /// Literal text or regular expression to search for
    #[arg(short = 'p', long = "pattern")]
    pattern: String,

    /// Root directory to search in
    #[arg(short = 'd', long, default_value = ".")]
    root: PathBuf,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Only search files whose name matches this glob (e.g. *.rs)
    #[arg(short = 'g', long)]
    glob: Option<String>,

    /// Number of lines before each match to show
    #[arg(short = 'C', long, default_value = "0")]
    context: usize,

    /// Maximum number of matches (0 for unlimited)
    #[arg(short = 'm', long)]
    max_results: Option<usize>,

    /// Number of threads to use
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Search hidden files and directories
    #[arg(long)]
    hidden: bool,

    /// Stop searching after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip files excluded by .gitignore and .ignore files
    #[arg(long)]
    gitignore: bool,

    /// Configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Print a statistics summary to stderr
    #[arg(short, long)]
    stats: bool,
}

impl CliSearchConfig {
    /// Only flags the user actually passed differ from the defaults, which is
    /// what `merge_with_cli` keys on.
    fn to_config(&self) -> SearchConfig {
        let defaults = SearchConfig::default();
        SearchConfig {
            ignore_case: self.ignore_case,
            file_pattern: self.glob.clone(),
            context_lines: self.context,
            max_results: self.max_results.unwrap_or(defaults.max_results),
            thread_count: self.threads.unwrap_or(defaults.thread_count),
            include_hidden: self.hidden,
            timeout_ms: self.timeout_ms,
            respect_gitignore: self.gitignore,
            ..defaults
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search file contents under a directory
    Search(Box<CliSearchConfig>),

    /// Report every regex match in every file as JSON
    SearchFiles {
        /// Directory to search in
        #[arg(short = 'd', long, default_value = ".")]
        path: PathBuf,

        /// Regular expression to search for
        #[arg(short = 'r', long)]
        regex: String,

        /// Only search files whose name matches this glob
        #[arg(short = 'g', long)]
        file_pattern: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => {
            let file_config = SearchConfig::load_from(args.config.as_deref())
                .context("Failed to load configuration")?;
            let config = file_config.merge_with_cli(args.to_config());
            init_logging(&config.log_level);
            debug!("Effective configuration: {:?}", config);

            let request = SearchRequest::new(&args.root, &args.pattern).with_config(config);
            let output = search(request)?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let reply = render_reply(&output);
                if !reply.is_empty() {
                    println!("{}", reply);
                }
            }

            if args.stats {
                print_stats(&output);
            }
        }
        Commands::SearchFiles {
            path,
            regex,
            file_pattern,
        } => {
            init_logging("warn");
            let args = SearchFilesArgs {
                path,
                regex,
                file_pattern,
            };
            println!("{}", handle_search_files(&args)?);
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_stats(output: &SearchOutput) {
    let duration = humantime::format_duration(output.stats.duration);
    eprintln!(
        "Found {} matches in {} files ({} files scanned, {} bytes) in {}",
        output.count().to_string().green(),
        output.files().len().to_string().green(),
        output.stats.files_scanned,
        output.stats.bytes_scanned,
        duration
    );
    match output.completion {
        Completion::Finished => {}
        Completion::TimedOut => eprintln!("{}", "Search timed out; results are partial".yellow()),
        Completion::Cancelled => eprintln!("{}", "Search cancelled; results are partial".yellow()),
    }
}
