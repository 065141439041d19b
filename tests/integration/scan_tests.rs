use dupmerge::cache::ScanCache;
use dupmerge::duplicates::{Classification, DuplicateFinder, FinderConfig, RootProblem, ScanError};
use dupmerge::scanner::{FingerprintScope, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path.canonicalize().unwrap()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (groups, summary) = DuplicateFinder::with_defaults().scan(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups(), 0);
    assert!(!summary.interrupted);
}

#[test]
fn test_two_equal_files_and_one_other() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.bin", &[7u8; 100]);
    let b = write(dir.path(), "b.bin", &[7u8; 100]);
    write(dir.path(), "c.bin", &[7u8; 200]);

    let groups = dupmerge::scan(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.classification, Classification::Exact);
    assert_eq!(group.fingerprint.scope, FingerprintScope::Full);
    assert_eq!(group.size, 100);
    assert_eq!(group.paths(), vec![a, b]);
    assert_eq!(group.reclaimable_bytes(), 100);
}

#[test]
fn test_same_size_different_content_is_not_a_group() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"content a");
    write(dir.path(), "b.txt", b"content b");

    let (groups, summary) = DuplicateFinder::with_defaults().scan(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.fingerprinted_files, 2);
    assert_eq!(summary.buckets_processed, 1);
}

#[test]
fn test_unique_sizes_are_never_read() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one", b"1");
    write(dir.path(), "two", b"22");
    write(dir.path(), "three", b"333");

    let (groups, summary) = DuplicateFinder::with_defaults().scan(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.eliminated_by_size, 3);
    assert_eq!(summary.buckets_total, 0);
    assert_eq!(summary.fingerprinted_files, 0);
}

#[test]
fn test_large_files_sharing_prefix_are_potential() {
    let dir = tempdir().unwrap();
    let size = 5 * 1024 * 1024;
    for (name, tail) in [("x.img", 1u8), ("y.img", 2u8), ("z.img", 3u8)] {
        let mut content = vec![0u8; size];
        content[size - 1] = tail;
        write(dir.path(), name, &content);
    }

    let (groups, summary) = DuplicateFinder::with_defaults().scan(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.classification, Classification::Potential);
    assert_eq!(group.fingerprint.scope, FingerprintScope::PartialPrefix);
    assert_eq!(group.len(), 3);
    assert!(!group.is_exact());
    assert_eq!(summary.potential_groups, 1);
    assert_eq!(summary.exact_groups, 0);
}

#[test]
fn test_nested_duplicates_and_sorting() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small/a", &[1u8; 10]);
    write(dir.path(), "small/b", &[1u8; 10]);
    write(dir.path(), "deep/er/big1", &[2u8; 1000]);
    write(dir.path(), "big2", &[2u8; 1000]);
    write(dir.path(), "big3", &[2u8; 1000]);

    let (groups, summary) = DuplicateFinder::with_defaults().scan(dir.path()).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].size, 1000);
    assert_eq!(groups[0].len(), 3);
    assert_eq!(groups[1].size, 10);
    assert_eq!(summary.duplicate_files, 3);
    assert_eq!(summary.reclaimable_bytes, 2010);
}

#[test]
fn test_rescan_is_stable() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        write(dir.path(), &format!("d{i}/same"), b"identical content");
    }
    write(dir.path(), "other", b"different content");

    let finder = DuplicateFinder::with_defaults();
    let (first, _) = finder.scan(dir.path()).unwrap();
    let (second, _) = finder.scan(dir.path()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_invalid_roots() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "file.txt", b"x");
    let finder = DuplicateFinder::with_defaults();

    match finder.scan(&dir.path().join("missing")) {
        Err(ScanError::InvalidRoot { problem, .. }) => assert_eq!(problem, RootProblem::NotFound),
        other => panic!("expected InvalidRoot, got {other:?}"),
    }
    match finder.scan(&file) {
        Err(ScanError::InvalidRoot { problem, .. }) => {
            assert_eq!(problem, RootProblem::NotADirectory)
        }
        other => panic!("expected InvalidRoot, got {other:?}"),
    }
}

#[test]
fn test_multiple_roots_overlap_counted_once() {
    let dir = tempdir().unwrap();
    write(dir.path(), "left/a", b"shared bytes");
    write(dir.path(), "right/b", b"shared bytes");

    let roots = vec![
        dir.path().to_path_buf(),
        dir.path().join("left"),
        dir.path().join("right"),
    ];
    let (groups, summary) = DuplicateFinder::with_defaults().scan_paths(&roots).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[cfg(unix)]
#[test]
fn test_link_into_another_root_is_not_a_duplicate() {
    let dir = tempdir().unwrap();
    let real = write(dir.path(), "r1/real.txt", b"the only copy of this");
    fs::create_dir_all(dir.path().join("r2")).unwrap();
    std::os::unix::fs::symlink(&real, dir.path().join("r2/zlink.txt")).unwrap();
    fs::hard_link(&real, dir.path().join("r2/hard.txt")).unwrap();

    let walker = WalkerConfig::default().with_follow_symlinks(true);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker));
    let roots = vec![dir.path().join("r1"), dir.path().join("r2")];
    let (groups, summary) = finder.scan_paths(&roots).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[test]
fn test_filters_from_walker_config() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep/a.dat", &[5u8; 64]);
    write(dir.path(), "keep/b.dat", &[5u8; 64]);
    write(dir.path(), "keep/c.tmp", &[5u8; 64]);
    write(dir.path(), "tiny/a", b"ab");
    write(dir.path(), "tiny/b", b"ab");

    let walker = WalkerConfig::default()
        .with_size_range(Some(10), None)
        .with_ignore_patterns(vec!["*.tmp".to_string()]);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker));
    let (groups, _) = finder.scan(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(groups[0].files.iter().all(|f| f.path.extension().unwrap() == "dat"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_reported_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"same same");
    write(dir.path(), "b", b"same same");
    let locked = write(dir.path(), "c", b"same same");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to observe then.
    if fs::read(&locked).is_ok() {
        return;
    }

    let (groups, summary) = DuplicateFinder::with_defaults().scan(dir.path()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(summary.fingerprint_errors.len(), 1);
    assert!(summary.has_errors());
}

#[test]
fn test_scan_cached_reuses_until_root_changes() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"cached content");
    write(dir.path(), "b", b"cached content");

    let finder = DuplicateFinder::with_defaults();
    let mut cache = ScanCache::new();

    let (first, summary) = finder.scan_cached(dir.path(), &mut cache).unwrap();
    assert!(!summary.from_cache);
    assert_eq!(cache.len(), 1);

    let (second, summary) = finder.scan_cached(dir.path(), &mut cache).unwrap();
    assert!(summary.from_cache);
    assert_eq!(first, second);

    write(dir.path(), "c", b"cached content");
    let (third, summary) = finder.scan_cached(dir.path(), &mut cache).unwrap();
    assert!(!summary.from_cache);
    assert_eq!(third[0].len(), 3);
}
