use dupmerge::duplicates::{DuplicateFinder, FinderConfig};
use dupmerge::progress::ProgressCallback;
use dupmerge::signal::CancelToken;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Cancels the scan once a given number of buckets has completed.
struct CancelAfterBuckets {
    token: CancelToken,
    limit: usize,
    completed: AtomicUsize,
}

impl ProgressCallback for CancelAfterBuckets {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _current: usize, _path: &str) {}

    fn on_bucket_complete(&self, _size: u64, _groups: usize) {
        if self.completed.fetch_add(1, Ordering::SeqCst) + 1 == self.limit {
            self.token.cancel();
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_cancel_after_two_of_five_buckets() {
    let dir = tempdir().unwrap();
    for bucket in 1..=5u8 {
        let content = vec![bucket; bucket as usize * 100];
        fs::write(dir.path().join(format!("b{bucket}-one")), &content).unwrap();
        fs::write(dir.path().join(format!("b{bucket}-two")), &content).unwrap();
    }

    let token = CancelToken::new();
    let callback = Arc::new(CancelAfterBuckets {
        token: token.clone(),
        limit: 2,
        completed: AtomicUsize::new(0),
    });
    let config = FinderConfig::default()
        .with_io_threads(1)
        .with_shutdown_flag(token.flag())
        .with_progress_callback(callback);

    let (groups, summary) = DuplicateFinder::new(config).scan(dir.path()).unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.buckets_total, 5);
    assert_eq!(summary.buckets_processed, 2);
    assert_eq!(summary.buckets_skipped, 3);
    assert_eq!(groups.len(), 2);

    // Buckets run largest size first.
    let mut sizes: Vec<u64> = groups.iter().map(|g| g.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![400, 500]);
    assert!(groups.iter().all(|g| g.len() == 2));
}

#[test]
fn test_cancelled_before_start_returns_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"never scanned").unwrap();
    fs::write(dir.path().join("b"), b"never scanned").unwrap();

    let token = CancelToken::new();
    token.cancel();
    let config = FinderConfig::default().with_shutdown_flag(token.flag());

    let (groups, summary) = DuplicateFinder::new(config).scan(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert!(summary.interrupted);
}

#[test]
fn test_uncancelled_token_changes_nothing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"complete scan").unwrap();
    fs::write(dir.path().join("b"), b"complete scan").unwrap();

    let token = CancelToken::new();
    let config = FinderConfig::default().with_shutdown_flag(token.flag());
    let (groups, summary) = DuplicateFinder::new(config).scan(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert!(!summary.interrupted);
    assert_eq!(summary.buckets_skipped, 0);
}
