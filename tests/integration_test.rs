use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parfind::{
    find, DirEntryInfo, EntryKind, FindError, JoinSummary, MatchCollector, MatchCounter, MatchSettings, Predicate,
    SlotPool, WalkStatus,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create the small tree used by most scenarios.
///
/// Structure:
/// ```text
/// tmp/
///   a.txt
///   sub/
///     b.txt
/// ```
fn setup_small_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("a.txt"), "a").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("b.txt"), "b").unwrap();

    dir
}

/// Create a wider tree so several workers get something to do.
///
/// `fanout` directories per level, `depth` levels, each directory holding a
/// `.txt`, a `.md` and a `.rs` file.
fn setup_wide_tree(fanout: usize, depth: usize) -> tempfile::TempDir {
    fn fill(dir: &Path, fanout: usize, depth: usize) {
        fs::write(dir.join("notes.txt"), "").unwrap();
        fs::write(dir.join("readme.md"), "").unwrap();
        fs::write(dir.join("main.rs"), "").unwrap();
        if depth == 0 {
            return;
        }
        for i in 0..fanout {
            let sub = dir.join(format!("d{i}"));
            fs::create_dir(&sub).unwrap();
            fill(&sub, fanout, depth - 1);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    fill(dir.path(), fanout, depth);
    dir
}

fn collect(root: &Path, pattern: &str, recursive: bool, threads: usize) -> (parfind::Results, Arc<MatchCollector>) {
    let collector = Arc::new(MatchCollector::new());
    let results = find()
        .root(root)
        .pattern(pattern)
        .recursive(recursive)
        .threads(threads)
        .with_predicate(Arc::clone(&collector))
        .collect_errors(true)
        .run()
        .unwrap();
    (results, collector)
}

fn as_set(entries: Vec<(PathBuf, bool)>) -> BTreeSet<(PathBuf, bool)> {
    entries.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn serial_walk_visits_every_file() {
    let dir = setup_small_tree();
    let root = dir.path();
    let (results, collector) = collect(root, "*.txt", true, 0);

    assert_eq!(results.status, WalkStatus::Completed);
    let expected: BTreeSet<_> = [
        (root.join("a.txt"), true),
        (root.join("sub").join("b.txt"), true),
    ]
    .into_iter()
    .collect();
    assert_eq!(as_set(collector.entries()), expected);
    assert!(
        collector.entries().iter().all(|(p, _)| p != &root.join("sub")),
        "directories are never handed to the predicate"
    );
    assert_eq!(results.stats.files, 2);
    assert_eq!(results.stats.dirs, 2);
    assert_eq!(results.pool.spawned, 0, "nothing is offloaded with zero capacity");
}

#[test]
fn single_slot_is_never_exceeded() {
    let dir = setup_small_tree();
    let (results, collector) = collect(dir.path(), "*.txt", true, 1);

    assert_eq!(collector.matches().len(), 2);
    assert!(results.pool.peak_busy <= 1);
    assert!(results.pool.is_idle());
    assert!(results.pool.is_consistent());
}

#[test]
fn missing_root_fails_without_visits() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let (results, collector) = collect(&missing, "*.txt", true, 2);

    assert_eq!(results.status, WalkStatus::Unavailable);
    assert!(!results.is_success());
    assert!(collector.entries().is_empty());
    assert_eq!(results.errors.len(), 1);
    assert!(matches!(
        &results.errors[0],
        FindError::DirectoryUnavailable { path, .. } if path == &missing
    ));
}

#[test]
fn file_root_is_unavailable() {
    let dir = setup_small_tree();
    let (results, collector) = collect(&dir.path().join("a.txt"), "*", false, 0);

    assert_eq!(results.status, WalkStatus::Unavailable);
    assert!(collector.entries().is_empty());
    assert!(matches!(results.errors.as_slice(), [FindError::NotADirectory(_)]));
}

#[cfg(unix)]
#[test]
fn symlinked_root_is_not_followed() {
    let dir = setup_small_tree();
    let link = dir.path().join("sub-link");
    std::os::unix::fs::symlink(dir.path().join("sub"), &link).unwrap();

    let (results, collector) = collect(&link, "*", true, 2);

    assert_eq!(results.status, WalkStatus::Unavailable);
    assert!(collector.entries().is_empty(), "nothing behind the link is visited");
    assert_eq!(results.stats.dirs, 0);
    assert!(matches!(
        results.errors.as_slice(),
        [FindError::NotADirectory(path)] if path == &link
    ));
}

#[test]
fn non_matching_pattern_still_visits() {
    let dir = setup_small_tree();
    let counter = Arc::new(MatchCounter::new());
    let results = find()
        .root(dir.path())
        .pattern("*.md")
        .recursive(true)
        .with_predicate(Arc::clone(&counter))
        .run()
        .unwrap();

    assert!(results.is_success());
    assert_eq!(counter.visited(), 2, "the walker hands over every file");
    assert_eq!(counter.matched(), 0, "matching is the predicate's call");
}

#[test]
fn non_recursive_stays_at_depth_one() {
    let dir = setup_wide_tree(2, 2);
    let (results, collector) = collect(dir.path(), "*", false, 4);

    let entries = collector.entries();
    assert_eq!(entries.len(), 3, "only the root's own files");
    assert!(entries.iter().all(|(p, _)| p.parent() == Some(dir.path())));
    assert_eq!(results.stats.dirs, 1);
    assert_eq!(results.pool.spawned, 0);
}

// ---------------------------------------------------------------------------
// Serial and parallel agree
// ---------------------------------------------------------------------------

#[test]
fn parallel_matches_serial() {
    let dir = setup_wide_tree(3, 3);
    let (serial, serial_hits) = collect(dir.path(), "*.txt", true, 0);
    let expected = as_set(serial_hits.entries());

    // 1 + 3 + 9 + 27 directories, 3 files each.
    assert_eq!(expected.len(), 120);
    assert_eq!(serial.stats.dirs, 40);

    for threads in [1, 2, 4, 8, 32] {
        let (results, hits) = collect(dir.path(), "*.txt", true, threads);
        assert_eq!(as_set(hits.entries()), expected, "threads = {threads}");
        assert_eq!(hits.entries().len(), expected.len(), "no entry visited twice");
        assert_eq!(results.stats.dirs, serial.stats.dirs);
        assert!(results.pool.peak_busy <= threads);
        assert!(results.pool.is_idle(), "every slot is free after the join");
        assert!(results.errors.is_empty());
    }
}

#[test]
fn agrees_with_walkdir() {
    let dir = setup_wide_tree(2, 3);
    let (_, collector) = collect(dir.path(), "*", true, 3);

    let expected: BTreeSet<PathBuf> = walkdir::WalkDir::new(dir.path())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() || e.file_type().is_symlink())
        .map(|e| e.path().to_path_buf())
        .collect();
    let seen: BTreeSet<PathBuf> = collector.entries().into_iter().map(|(p, _)| p).collect();

    assert_eq!(seen, expected);
    assert!(collector.entries().iter().all(|(_, matched)| *matched));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn over_long_paths_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("ok"), "").unwrap();
    fs::write(root.join("much-too-long-for-the-limit.txt"), "").unwrap();

    let limit = root.join("ok").as_os_str().len() + 4;
    let collector = Arc::new(MatchCollector::new());
    let results = find()
        .root(root)
        .pattern("*")
        .max_path_len(limit)
        .with_predicate(Arc::clone(&collector))
        .collect_errors(true)
        .run()
        .unwrap();

    assert!(results.is_success(), "a skipped entry does not fail the directory");
    assert_eq!(collector.entries(), vec![(root.join("ok"), true)]);
    assert_eq!(results.errors.len(), 1);
    assert!(matches!(results.errors[0], FindError::PathTooLong { max, .. } if max == limit));
}

#[test]
fn capacity_above_max_is_rejected() {
    let dir = setup_small_tree();
    let err = find()
        .root(dir.path())
        .pattern("*")
        .threads(parfind::MAX_CAPACITY + 1)
        .with_predicate(MatchCounter::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, FindError::CapacityExceeded { requested: 256, .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn pattern_is_required() {
    let dir = setup_small_tree();
    let err = find()
        .root(dir.path())
        .with_predicate(MatchCounter::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, FindError::InvalidPattern { .. }));
}

#[test]
fn errors_empty_when_not_collecting() {
    let dir = tempfile::tempdir().unwrap();
    let results = find()
        .root(dir.path().join("gone"))
        .pattern("*")
        .with_predicate(MatchCounter::new())
        .run()
        .unwrap();

    assert!(!results.is_success());
    assert!(
        results.errors.is_empty(),
        "errors should be empty when collect_errors is false"
    );
}

#[test]
fn panicking_predicate_frees_its_slot() {
    struct Fussy;
    impl Predicate for Fussy {
        fn visit(&self, _settings: &MatchSettings, entry: &DirEntryInfo) {
            if entry.name == "b.txt" {
                panic!("refusing {}", entry.path.display());
            }
        }
    }

    let dir = setup_small_tree();
    let results = find()
        .root(dir.path())
        .pattern("*")
        .recursive(true)
        .threads(1)
        .with_predicate(Fussy)
        .collect_errors(true)
        .run()
        .unwrap();

    // `sub` is offloaded to slot 0 because the slot is free when it is found.
    assert!(results.is_success(), "the root itself completed");
    assert!(results.pool.is_idle());
    assert!(matches!(results.errors.as_slice(), [FindError::WorkerPanicked { slot: 0 }]));
}

/// Panics on its creator's thread for anything two levels down, and counts
/// (slowly) what it sees everywhere else.
struct PanicsOnCaller {
    caller: ThreadId,
    visits: AtomicUsize,
}

impl Predicate for PanicsOnCaller {
    fn visit(&self, _settings: &MatchSettings, entry: &DirEntryInfo) {
        if thread::current().id() == self.caller && entry.depth == 2 {
            panic!("refusing {}", entry.path.display());
        }
        thread::sleep(Duration::from_millis(20));
        self.visits.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn caller_panic_waits_for_workers() {
    let dir = tempfile::tempdir().unwrap();
    for d in 0..3 {
        let sub = dir.path().join(format!("d{d}"));
        fs::create_dir(&sub).unwrap();
        for f in 0..5 {
            fs::write(sub.join(format!("f{f}.txt")), "").unwrap();
        }
    }

    let predicate = Arc::new(PanicsOnCaller {
        caller: thread::current().id(),
        visits: AtomicUsize::new(0),
    });
    let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        find()
            .root(dir.path())
            .pattern("*")
            .recursive(true)
            .threads(1)
            .with_predicate(Arc::clone(&predicate))
            .run()
    }));
    assert!(outcome.is_err(), "the predicate's panic reaches the caller");

    // The first subdirectory went to slot 0; the next one was walked inline
    // and panicked. No worker may still be calling the predicate now.
    let at_return = predicate.visits.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(predicate.visits.load(Ordering::SeqCst), at_return);
}

#[cfg(unix)]
#[test]
fn non_utf8_names_are_kept_verbatim() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().unwrap();
    let name = OsStr::from_bytes(b"bad\xffname.txt");
    if fs::write(dir.path().join(name), "").is_err() {
        // Some filesystems only accept UTF-8 names.
        return;
    }

    let (results, collector) = collect(dir.path(), "*.txt", false, 0);

    assert!(results.is_success());
    let matches = collector.matches();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].file_name(), Some(name));
    assert!(matches[0].exists(), "the reported path names the real file");
}

#[test]
fn pool_can_be_driven_directly() {
    let pool = SlotPool::new(2).unwrap();
    {
        let mut guard = pool.lock().unwrap();
        let slot = guard.acquire_free_slot().unwrap();
        assert!(guard.mark_busy(slot));
        guard.bind_worker(slot, thread::spawn(|| {}));
        drop(guard);
        pool.release(slot);
    }

    let summary: JoinSummary = pool.join_busy().unwrap();
    assert_eq!(summary.joined, 1);
    assert!(summary.panicked.is_empty());
    assert!(pool.snapshot().is_idle());
}

#[cfg(unix)]
#[test]
fn symlinks_are_visited_not_followed() {
    let dir = setup_small_tree();
    let root = dir.path();
    std::os::unix::fs::symlink(root.join("sub"), root.join("sub-link")).unwrap();
    std::os::unix::fs::symlink(root.join("a.txt"), root.join("a-link.txt")).unwrap();

    struct Kinds(std::sync::Mutex<Vec<(OsString, EntryKind)>>);
    impl Predicate for Kinds {
        fn visit(&self, _settings: &MatchSettings, entry: &DirEntryInfo) {
            self.0.lock().unwrap().push((entry.name.clone(), entry.kind));
        }
    }

    let kinds = Arc::new(Kinds(std::sync::Mutex::new(Vec::new())));
    find()
        .root(root)
        .pattern("*")
        .recursive(true)
        .threads(2)
        .with_predicate(Arc::clone(&kinds))
        .run()
        .unwrap();

    let seen: BTreeSet<(OsString, EntryKind)> = kinds.0.lock().unwrap().iter().cloned().collect();
    let expected: BTreeSet<(OsString, EntryKind)> = [
        ("a.txt".into(), EntryKind::File),
        ("b.txt".into(), EntryKind::File),
        ("a-link.txt".into(), EntryKind::Symlink),
        ("sub-link".into(), EntryKind::Symlink),
    ]
    .into_iter()
    .collect();
    assert_eq!(seen, expected, "b.txt is reached once, through sub only");
}
