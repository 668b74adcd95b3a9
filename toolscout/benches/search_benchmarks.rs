use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::{fs::File, io::Write};
use tempfile::tempdir;
use toolscout::search::PatternMatcher;
use toolscout::{find, SearchConfig};

fn create_test_files(
    dir: &tempfile::TempDir,
    file_count: usize,
    lines_per_file: usize,
) -> std::io::Result<()> {
    for i in 0..file_count {
        let file_path = dir.path().join(format!("test_{}.txt", i));
        let mut file = File::create(file_path)?;
        for j in 0..lines_per_file {
            writeln!(
                file,
                "Line {} TODO: fix bug {} FIXME: optimize line {} NOTE: important task {}",
                j, j, j, j
            )?;
        }
    }
    Ok(())
}

fn bench_matcher(c: &mut Criterion) {
    let line = "Line 42 TODO: fix bug 42 FIXME: optimize line 42 NOTE: important task 42";
    let mut group = c.benchmark_group("matcher");

    for (name, pattern, ignore_case) in [
        ("literal", "important", false),
        ("literal_ignore_case", "IMPORTANT", true),
        ("regex", r"NOTE:.*important.*\d+", false),
    ] {
        let matcher = PatternMatcher::new(pattern, ignore_case).unwrap();
        let mut scratch = String::new();
        group.bench_function(name, |b| {
            b.iter(|| matcher.find_in(black_box(line), &mut scratch))
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    create_test_files(&dir, 50, 200).unwrap();

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for pattern in ["TODO", r"FIXME:.*line \d+"] {
        group.bench_with_input(BenchmarkId::new("pattern", pattern), &pattern, |b, pattern| {
            b.iter(|| {
                let config = SearchConfig::default().with_max_results(0);
                find(black_box(pattern), dir.path(), config).unwrap()
            })
        });
    }

    for context in [0, 4] {
        group.bench_with_input(BenchmarkId::new("context", context), &context, |b, &context| {
            b.iter(|| {
                let config = SearchConfig::default()
                    .with_max_results(0)
                    .with_context_lines(context);
                find("NOTE", dir.path(), config).unwrap()
            })
        });
    }

    for threads in [1, 4] {
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                let config = SearchConfig::default()
                    .with_max_results(0)
                    .with_threads(threads);
                find("TODO", dir.path(), config).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matcher, bench_search);
criterion_main!(benches);
