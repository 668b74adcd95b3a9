use anyhow::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use toolscout::search::search;
use toolscout::{
    find, CancellationToken, Completion, SearchConfig, SearchEngine, SearchError, SearchRequest,
};

fn create_test_files(dir: &Path, file_count: usize, lines_per_file: usize) -> Result<()> {
    for i in 0..file_count {
        let mut file = File::create(dir.join(format!("test_{:04}.txt", i)))?;
        for j in 0..lines_per_file {
            writeln!(file, "Line {} in file {}: TODO implement this", j, i)?;
            writeln!(file, "Another line {} in file {}: nothing special", j, i)?;
            writeln!(file, "FIXME: This is a bug in file {} line {}", i, j)?;
        }
    }
    Ok(())
}

#[test]
fn test_single_literal_match() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.go"), "func main() {}\n")?;

    let result = find("func", dir.path(), SearchConfig::default())?;
    assert_eq!(result.count(), 1);
    let m = &result.matches[0];
    assert_eq!(m.file, dir.path().join("a.go"));
    assert_eq!(m.line, 1);
    assert_eq!(m.column, 1);
    assert_eq!(m.content, "func main() {}");
    assert!(m.context.is_empty());
    Ok(())
}

#[test]
fn test_binary_file_is_skipped() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("x.bin"), b"ab\0d then func later\n")?;
    // Binary by content alone, without a telling extension
    fs::write(dir.path().join("x.data"), b"\0\0\0\0func\n")?;

    let result = find("func", dir.path(), SearchConfig::default())?;
    assert!(!result.has_matches());
    Ok(())
}

#[test]
fn test_max_results_cap() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..150 {
        fs::write(dir.path().join(format!("f{:03}.txt", i)), "needle\n")?;
    }

    let result = find("needle", dir.path(), SearchConfig::default().with_max_results(100))?;
    assert_eq!(result.count(), 100);
    assert_eq!(result.stats.matches_found, 100);
    Ok(())
}

#[test]
fn test_invalid_pattern_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "[invalid\n")?;

    let err = find("[invalid", dir.path(), SearchConfig::default()).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern(_)));

    // Rejected before any walk: even a missing root gives the same error
    let err = find("[invalid", dir.path().join("missing"), SearchConfig::default()).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern(_)));
    Ok(())
}

#[test]
fn test_timeout_returns_partial_result() -> Result<()> {
    let dir = tempdir()?;
    let total = 3000;
    create_test_files(dir.path(), total, 60)?;

    // Find a budget long enough to finish some files but not all of them
    let mut timeout = Duration::from_millis(1);
    let mut partial = None;
    while timeout <= Duration::from_secs(4) {
        let config = SearchConfig::default()
            .with_threads(1)
            .with_max_results(0)
            .with_timeout(timeout);
        let result = find("TODO", dir.path(), config)?;

        let scanned = result.stats.files_scanned as usize;
        if result.completion == Completion::TimedOut && scanned > 0 && scanned < total {
            partial = Some(result);
            break;
        }
        timeout *= 2;
    }

    let result = partial.expect("no time budget produced a partial scan");
    assert!(result.timed_out());
    assert!(result.stats.files_scanned > 0);
    assert!((result.stats.files_scanned as usize) < total);
    assert!(result.windows_sorted());
    Ok(())
}

#[test]
fn test_external_cancel() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), 50, 10)?;

    let engine = SearchEngine::new(SearchRequest::new(dir.path(), "TODO"))?;
    let token = CancellationToken::new();
    token.cancel();

    let result = engine.search_with_token(&token)?;
    assert_eq!(result.completion, Completion::Cancelled);
    assert!(!result.has_matches());
    Ok(())
}

#[test]
fn test_count_matches_lines_containing_pattern() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("src/deep"))?;
    fs::create_dir_all(root.join(".cache"))?;
    fs::write(root.join("src/a.rs"), "// TODO one\nfn a() {}\n// TODO two TODO\n")?;
    fs::write(root.join("src/deep/b.rs"), "TODO\r\nno\r\nTODO")?;
    fs::write(root.join(".cache/c.rs"), "TODO hidden\n")?;
    fs::write(root.join(".env"), "TODO hidden\n")?;
    fs::write(root.join("img.png"), "TODO binary ext\n")?;
    fs::write(root.join("raw"), b"TODO\0binary\n")?;

    let result = find("TODO", root, SearchConfig::default())?;
    // 2 lines in a.rs and 2 in b.rs
    assert_eq!(result.count(), 4);
    assert_eq!(result.files(), vec![root.join("src/a.rs"), root.join("src/deep/b.rs")]);

    let with_hidden = find("TODO", root, SearchConfig::default().with_hidden())?;
    assert_eq!(with_hidden.count(), 6);
    Ok(())
}

#[test]
fn test_results_sorted_and_idempotent() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), 40, 20)?;
    fs::create_dir(dir.path().join("sub"))?;
    create_test_files(&dir.path().join("sub"), 10, 5)?;

    let config = SearchConfig::default().with_max_results(0).with_threads(8);
    let first = find("FIXME", dir.path(), config.clone())?;
    let second = find("FIXME", dir.path(), config)?;

    assert_eq!(first.count(), 40 * 20 + 10 * 5);
    assert!(first.windows_sorted());
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.stats.files_scanned, second.stats.files_scanned);
    assert_eq!(first.stats.bytes_scanned, second.stats.bytes_scanned);
    Ok(())
}

#[test]
fn test_max_results_boundary() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(dir.path(), 5, 4)?;

    for cap in [1, 7, 20, 21, 500] {
        let result = find("TODO", dir.path(), SearchConfig::default().with_max_results(cap))?;
        assert_eq!(result.count(), cap.min(20), "cap {}", cap);
    }
    Ok(())
}

#[test]
fn test_context_lines_boundary() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "hit\nx\ny\nz\nhit\n")?;

    let none = find("hit", dir.path(), SearchConfig::default())?;
    assert!(none.matches.iter().all(|m| m.context.is_empty()));

    let two = find("hit", dir.path(), SearchConfig::default().with_context_lines(2))?;
    assert!(two.matches[0].context.is_empty());
    assert_eq!(two.matches[1].context, vec!["y", "z"]);
    assert!(two.matches.iter().all(|m| m.context.len() <= 2));
    Ok(())
}

#[test]
fn test_file_pattern_and_ignore_case() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("main.go"), "func Main() {}\n")?;
    fs::write(dir.path().join("main.rs"), "fn main() {}\n")?;

    let config = SearchConfig::default().with_file_pattern("*.go").with_ignore_case();
    let result = find("MAIN", dir.path(), config)?;
    assert_eq!(result.files(), vec![dir.path().join("main.go")]);
    assert_eq!(result.matches[0].column, 6);
    Ok(())
}

#[test]
fn test_regex_pattern() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.go"), "package a\nfunc Foo(x int) {}\nvar f = func() {}\n")?;

    let result = search(SearchRequest::new(dir.path(), r"func\s+\w+\("))?;
    assert_eq!(result.count(), 1);
    assert_eq!(result.matches[0].line, 2);
    Ok(())
}

trait Sorted {
    fn windows_sorted(&self) -> bool;
}

impl Sorted for toolscout::SearchOutput {
    fn windows_sorted(&self) -> bool {
        self.matches
            .windows(2)
            .all(|w| (&w[0].file, w[0].line) <= (&w[1].file, w[1].line))
    }
}
