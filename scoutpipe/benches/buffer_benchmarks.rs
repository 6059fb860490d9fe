use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scoutpipe::{
    run_with, search::QueryMatcher, BoundedBuffer, CoordinatorConfig, LocalWorker, Task,
};
use std::{fs::File, io::Write, num::NonZeroUsize, path::PathBuf, thread};
use tempfile::tempdir;

const ITEMS: usize = 10_000;

fn create_test_files(
    dir: &tempfile::TempDir,
    file_count: usize,
    lines_per_file: usize,
) -> std::io::Result<()> {
    for i in 0..file_count {
        let sub = dir.path().join(format!("dir_{}", i % 8));
        std::fs::create_dir_all(&sub)?;
        let mut file = File::create(sub.join(format!("test_{}.txt", i)))?;
        for j in 0..lines_per_file {
            writeln!(file, "Line {} TODO: fix bug {} NOTE: todo later", j, j)?;
        }
    }
    Ok(())
}

fn bench_buffer_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("Buffer Handoff");
    for &(capacity, consumers) in &[(1usize, 1usize), (16, 1), (16, 4), (256, 4)] {
        group.bench_with_input(
            BenchmarkId::new(format!("cap_{}", capacity), consumers),
            &(capacity, consumers),
            |b, &(capacity, consumers)| {
                b.iter(|| {
                    let buffer = BoundedBuffer::new(NonZeroUsize::new(capacity).unwrap());
                    thread::scope(|s| {
                        for _ in 0..consumers {
                            s.spawn(|| {
                                let mut seen = 0usize;
                                while let Task::Path(path) = buffer.get() {
                                    seen += black_box(path).as_os_str().len();
                                }
                                seen
                            });
                        }
                        let path = PathBuf::from("a/b/c.txt");
                        for _ in 0..ITEMS {
                            buffer.put(Task::Path(path.clone()));
                        }
                        for _ in 0..consumers {
                            buffer.put(Task::Sentinel);
                        }
                    });
                });
            },
        );
    }
    group.finish();
}

fn bench_matcher(c: &mut Criterion) {
    let matcher = QueryMatcher::new("todo");
    let short = b"Line 1 TODO: fix bug 1 NOTE: todo later".to_vec();
    let long = short.repeat(64);
    let dense = b"todotodotodo".repeat(32);

    let mut group = c.benchmark_group("Matcher");
    group.bench_function("short_line", |b| {
        b.iter(|| black_box(matcher.find_columns(black_box(&short))))
    });
    group.bench_function("long_line", |b| {
        b.iter(|| black_box(matcher.find_columns(black_box(&long))))
    });
    group.bench_function("dense_overlaps", |b| {
        b.iter(|| black_box(matcher.find_columns(black_box(&dense))))
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let tree = tempdir().unwrap();
    let out = tempdir().unwrap();
    create_test_files(&tree, 200, 20).unwrap();

    let mut group = c.benchmark_group("Pipeline");
    for &workers in &[1usize, 2, 4] {
        let config = CoordinatorConfig {
            log_path: out.path().join("searchlog.txt"),
            output_dir: out.path().to_path_buf(),
            ..CoordinatorConfig::new(
                NonZeroUsize::new(workers).unwrap(),
                NonZeroUsize::new(8).unwrap(),
                "todo",
                tree.path(),
            )
        };
        group.bench_function(format!("workers_{}", workers), |b| {
            b.iter(|| {
                black_box(run_with(&config, |id| LocalWorker::in_memory(id, "todo")).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_buffer_handoff, bench_matcher, bench_pipeline);
criterion_main!(benches);
