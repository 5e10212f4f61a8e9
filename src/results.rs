use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FindError;
use crate::pool::PoolSnapshot;

/// How a single directory traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    /// The directory was listed to the end.
    Completed,

    /// The directory could not be opened. Nothing below it was visited.
    Unavailable,

    /// Another worker hit a fatal error and the listing was abandoned.
    Aborted,
}

impl WalkStatus {
    pub fn is_success(self) -> bool {
        self == WalkStatus::Completed
    }
}

/// The output of a completed search.
///
/// Match results live in the predicate; this only reports how the traversal
/// itself went.
#[derive(Debug)]
pub struct Results {
    /// Outcome of walking the root directory. Failures deeper in the tree do
    /// not change it; see [`Results::errors`].
    pub status: WalkStatus,

    /// Scan performance statistics.
    pub stats: ScanStats,

    /// Non-fatal errors encountered during the search (unreadable
    /// directories, over-long paths, panicked workers).
    /// Only populated if `.collect_errors(true)` was set on the builder.
    pub errors: Vec<FindError>,

    /// Slot bookkeeping after the final join.
    pub pool: PoolSnapshot,
}

impl Results {
    /// The root was walked to completion.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The root was walked to completion and no error was collected anywhere
    /// below it.
    pub fn is_clean(&self) -> bool {
        self.is_success() && self.errors.is_empty()
    }
}

/// Performance statistics for a completed scan.
#[derive(Debug, Clone)]
pub struct ScanStats {
    /// Files and symlinks handed to the predicate.
    pub files: usize,

    /// Directories successfully listed, root included.
    pub dirs: usize,

    /// Wall-clock time from search start to the final join.
    pub duration: Duration,

    /// Total entries scanned per second. Convenience field, equals
    /// `(files + dirs) / duration.as_secs_f64()`, clamped to 0 on
    /// zero-duration runs.
    pub entries_per_sec: usize,
}

impl ScanStats {
    /// Compute `entries_per_sec` from raw counts and duration.
    pub(crate) fn compute(files: usize, dirs: usize, duration: Duration) -> Self {
        let total = files + dirs;
        let eps = if duration.as_secs_f64() > 0.0 {
            (total as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        Self {
            files,
            dirs,
            duration,
            entries_per_sec: eps,
        }
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Run-wide counters and error sink shared by every traversal context.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    files:          AtomicUsize,
    dirs:           AtomicUsize,
    collect_errors: bool,
    errors:         Mutex<Vec<FindError>>,
    aborted:        AtomicBool,
    fatal:          Mutex<Option<FindError>>,
}

impl Tally {
    pub fn new(collect_errors: bool) -> Self {
        Self {
            collect_errors,
            ..Self::default()
        }
    }

    pub fn count_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_dir(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    /// Keep a recoverable error for the final report.
    pub fn record(&self, err: FindError) {
        if !self.collect_errors {
            return;
        }
        if let Ok(mut errs) = self.errors.lock() {
            errs.push(err);
        }
    }

    /// Stop the traversal. Only the first fatal error is kept.
    pub fn abort(&self, err: FindError) {
        self.aborted.store(true, Ordering::SeqCst);
        if let Ok(mut fatal) = self.fatal.lock() {
            if fatal.is_none() {
                *fatal = Some(err);
            }
        }
    }

    /// Stop the traversal without a fatal error of its own.
    pub fn halt(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn files(&self) -> usize {
        self.files.load(Ordering::Relaxed)
    }

    pub fn dirs(&self) -> usize {
        self.dirs.load(Ordering::Relaxed)
    }

    pub fn take_fatal(&self) -> Option<FindError> {
        self.fatal.lock().ok().and_then(|mut f| f.take())
    }

    pub fn take_errors(&self) -> Vec<FindError> {
        self.errors
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}
