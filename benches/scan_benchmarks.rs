use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dupmerge::duplicates::{bucket_by_size, DuplicateFinder, FinderConfig};
use dupmerge::scanner::{FileEntry, Hasher, Walker, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// Tree of `2^depth - 1` directories; every third file in a directory
/// repeats content found elsewhere in the tree.
fn setup_tree(depth: usize, files_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    populate(temp_dir.path(), depth, files_per_dir);
    temp_dir
}

fn populate(path: &Path, depth: usize, files_per_dir: usize) {
    if depth == 0 {
        return;
    }
    fs::create_dir_all(path).expect("Failed to create dir");

    for i in 0..files_per_dir {
        let content = if i % 3 == 0 {
            format!("shared content {}", i % 5)
        } else {
            format!("unique content {} in {}", i, path.display())
        };
        fs::write(path.join(format!("file_{i}.txt")), content).expect("Failed to write file");
    }

    for i in 0..2 {
        populate(&path.join(format!("dir_{i}")), depth - 1, files_per_dir);
    }
}

fn bench_walker(c: &mut Criterion) {
    let temp_dir = setup_tree(4, 10);
    let config = WalkerConfig::default();

    c.bench_function("walker_150_files", |b| {
        b.iter(|| {
            let walker = Walker::new(temp_dir.path(), config.clone());
            let files: Vec<_> = walker.walk().collect();
            black_box(files);
        })
    });
}

fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hasher");
    let hasher = Hasher::new();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    for size_kb in [1u64, 512, 10 * 1024] {
        let path = temp_dir.path().join(format!("bench_{size_kb}.dat"));
        fs::write(&path, vec![b'a'; (size_kb * 1024) as usize]).expect("Failed to write file");
        let entry = FileEntry::from_path(&path).expect("Failed to stat file");

        // 10 MiB exceeds the large-file threshold and is prefix-hashed.
        group.bench_with_input(BenchmarkId::new("fingerprint_kib", size_kb), &entry, |b, e| {
            b.iter(|| black_box(hasher.fingerprint(e).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("full_hash_kib", size_kb), &path, |b, p| {
            b.iter(|| black_box(hasher.full_hash(p).unwrap()));
        });
    }
    group.finish();
}

fn bench_bucketing(c: &mut Criterion) {
    let now = SystemTime::now();
    let entries: Vec<FileEntry> = (0..100_000u64)
        .map(|i| FileEntry::new(PathBuf::from(format!("/bench/{i}")), 1 + i % 20_000, now))
        .collect();

    c.bench_function("bucket_by_size_100k", |b| {
        b.iter(|| black_box(bucket_by_size(entries.clone())));
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let temp_dir = setup_tree(5, 12);
    let mut group = c.benchmark_group("scan");

    for threads in [1usize, 4] {
        let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(threads));
        group.bench_with_input(BenchmarkId::new("io_threads", threads), &finder, |b, f| {
            b.iter(|| black_box(f.scan(temp_dir.path()).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_walker,
    bench_hasher,
    bench_bucketing,
    bench_pipeline
);
criterion_main!(benches);
