use dupmerge::actions::{
    MergeConfig, MergeEngine, MergeError, OutcomeStatus, PathGuard, PermanentRemover,
    PotentialPolicy,
};
use dupmerge::{merge, scan, DuplicateGroup, MergeStrategy};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

const YEAR: u64 = 365 * 24 * 60 * 60;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.canonicalize().unwrap()
}

fn single_group(root: &Path) -> DuplicateGroup {
    let mut groups = scan(root).unwrap();
    assert_eq!(groups.len(), 1, "expected exactly one group");
    groups.remove(0)
}

fn year(y: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs((y - 1970) * YEAR)
}

#[test]
fn test_keep_oldest_deletes_newer_copy() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.txt", b"same payload");
    let b = write(dir.path(), "b.txt", b"same payload");

    let mut group = single_group(dir.path());
    // Creation times cannot be set portably; assign them on the scanned entries.
    for file in &mut group.files {
        file.created = if file.path == a { year(2020) } else { year(2023) };
    }

    let result = merge(&[group], MergeStrategy::KeepOldest);

    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.reclaimed_bytes, 12);
    assert_eq!(result.survivors, vec![a.clone()]);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].path, b);
    assert_eq!(result.outcomes[0].status, OutcomeStatus::Deleted);
    assert!(a.exists());
    assert!(!b.exists());
}

#[test]
fn test_target_removed_before_merge_is_already_absent() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.txt", b"vanishing");
    let b = write(dir.path(), "b.txt", b"vanishing");

    let group = single_group(dir.path());
    fs::remove_file(&b).unwrap();

    let result = merge(&[group], MergeStrategy::KeepFirst);

    assert_eq!(result.deleted_count, 0);
    assert_eq!(result.reclaimed_bytes, 0);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].status, OutcomeStatus::AlreadyAbsent);
    assert!(result.is_complete());
    assert!(a.exists());
}

#[test]
fn test_every_keep_strategy_leaves_one_member() {
    let strategies = [
        MergeStrategy::KeepOldest,
        MergeStrategy::KeepNewest,
        MergeStrategy::KeepFirst,
        MergeStrategy::KeepLast,
    ];

    for strategy in strategies {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| write(dir.path(), &format!("copy{i}"), b"five copies"))
            .collect();

        let group = single_group(dir.path());
        let result = merge(&[group], strategy);

        assert_eq!(result.outcomes.len(), 4, "{strategy}");
        assert_eq!(result.deleted_count, 4, "{strategy}");
        let remaining: Vec<&PathBuf> = paths.iter().filter(|p| p.exists()).collect();
        assert_eq!(remaining.len(), 1, "{strategy}");
        assert_eq!(&result.survivors[0], remaining[0], "{strategy}");
    }
}

#[test]
fn test_keep_first_and_last_follow_path_order() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"ordered");
    write(dir.path(), "b", b"ordered");
    let c = write(dir.path(), "c", b"ordered");

    let group = single_group(dir.path());
    let engine = MergeEngine::with_defaults();
    let first = engine.plan(std::slice::from_ref(&group), MergeStrategy::KeepFirst);
    let last = engine.plan(std::slice::from_ref(&group), MergeStrategy::KeepLast);

    assert_eq!(first[0].survivor, a);
    assert_eq!(last[0].survivor, c);
    assert_eq!(first[0].targets.len(), 2);
    assert_eq!(first[0].reclaimable_bytes, 14);
}

#[test]
fn test_file_changed_after_scan_is_kept() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"original");
    let b = write(dir.path(), "b", b"original");

    let group = single_group(dir.path());
    fs::write(&b, b"rewritten with more bytes").unwrap();

    let result = merge(&[group], MergeStrategy::KeepFirst);

    assert_eq!(result.deleted_count, 0);
    assert!(matches!(result.outcomes[0].status, OutcomeStatus::Failed(_)));
    assert!(b.exists());
    assert!(!result.is_complete());
}

#[test]
fn test_touched_target_is_kept_when_verification_on() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"touch me");
    let b = write(dir.path(), "b", b"touch me");

    let group = single_group(dir.path());
    filetime::set_file_mtime(&b, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let result = merge(&[group.clone()], MergeStrategy::KeepFirst);
    assert_eq!(result.deleted_count, 0);
    assert!(b.exists());

    let lenient = MergeEngine::new(Box::new(PermanentRemover))
        .with_config(MergeConfig::default().with_verify_unchanged(false));
    let result = lenient.merge(&[group], MergeStrategy::KeepFirst);
    assert_eq!(result.deleted_count, 1);
    assert!(!b.exists());
}

#[test]
fn test_missing_survivor_protects_last_copy() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"last copy");
    let b = write(dir.path(), "b", b"last copy");

    let group = single_group(dir.path());
    fs::remove_file(&a).unwrap();

    let result = merge(&[group], MergeStrategy::KeepFirst);

    assert!(result.outcomes.is_empty());
    assert_eq!(result.group_errors.len(), 1);
    assert_eq!(
        result.group_errors[0].error,
        MergeError::SurvivorMissing { path: a }
    );
    assert!(b.exists());
}

fn potential_files(dir: &Path, tails: &[u8]) -> Vec<PathBuf> {
    let size = 2 * 1024 * 1024;
    tails
        .iter()
        .enumerate()
        .map(|(i, tail)| {
            let mut content = vec![9u8; size];
            content[size - 1] = *tail;
            write(dir, &format!("big{i}.img"), &content)
        })
        .collect()
}

#[test]
fn test_potential_group_verified_against_survivor() {
    let dir = tempdir().unwrap();
    let paths = potential_files(dir.path(), &[1, 1, 2]);

    let group = single_group(dir.path());
    assert!(!group.is_exact());

    let result = merge(&[group], MergeStrategy::KeepFirst);

    assert_eq!(result.deleted_count, 1);
    assert!(paths[0].exists());
    assert!(!paths[1].exists());
    assert!(paths[2].exists());
    let failed = result
        .outcomes
        .iter()
        .find(|o| o.path == paths[2])
        .unwrap();
    assert_eq!(
        failed.status,
        OutcomeStatus::Failed("content differs from survivor".to_string())
    );
}

#[test]
fn test_potential_group_skipped_by_policy() {
    let dir = tempdir().unwrap();
    let paths = potential_files(dir.path(), &[1, 1]);

    let group = single_group(dir.path());
    let engine = MergeEngine::with_defaults()
        .with_config(MergeConfig::default().with_potential_policy(PotentialPolicy::Skip));
    let result = engine.merge(&[group], MergeStrategy::KeepFirst);

    assert_eq!(result.group_errors[0].error, MergeError::PotentialSkipped);
    assert!(paths.iter().all(|p| p.exists()));
}

#[test]
fn test_allowed_roots_restrict_targets() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("keep")).unwrap();
    fs::create_dir(dir.path().join("scratch")).unwrap();
    write(&dir.path().join("keep"), "a", b"guarded");
    let b = write(&dir.path().join("keep"), "b", b"guarded");
    let c = write(&dir.path().join("scratch"), "c", b"guarded");

    let group = single_group(dir.path());
    let guard = PathGuard::default().with_allowed_roots(vec![dir
        .path()
        .join("scratch")
        .canonicalize()
        .unwrap()]);
    let engine = MergeEngine::with_defaults().with_guard(guard);
    let result = engine.merge(&[group], MergeStrategy::KeepFirst);

    assert_eq!(result.deleted_count, 1);
    assert!(b.exists());
    assert!(!c.exists());
    assert_eq!(result.failed_count(), 1);
}
