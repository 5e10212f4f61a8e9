use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::context::TraversalContext;
use crate::entry::DirEntryInfo;
use crate::error::FindError;
use crate::pool::SlotPool;
use crate::predicates::ConsolePrinter;
use crate::results::{Results, ScanStats, Tally, WalkStatus};
use crate::settings::{LogLevel, MatchSettings, MAX_PATH_LEN};
use crate::traits::Predicate;
use crate::walker;

// ---------------------------------------------------------------------------
// FindBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing a traversal.
///
/// Created via [`parfind::find()`](crate::find). Configure with chained
/// builder methods, then call [`run()`](FindBuilder::run) to execute.
///
/// # Example
///
/// ```rust,ignore
/// let results = parfind::find()
///     .root("/var/log")
///     .pattern("*.gz")
///     .recursive(true)
///     .threads(8)
///     .with_predicate(my_predicate)
///     .run()?;
/// ```
pub struct FindBuilder {
    root:           Option<PathBuf>,
    pattern:        Option<String>,
    recursive:      bool,
    threads:        usize,
    log_level:      LogLevel,
    max_path_len:   usize,
    predicate:      Option<Arc<dyn Predicate>>,
    collect_errors: bool,
}

impl Default for FindBuilder {
    fn default() -> Self {
        Self {
            root:           None,
            pattern:        None,
            recursive:      false,
            threads:        0,
            log_level:      LogLevel::default(),
            max_path_len:   MAX_PATH_LEN,
            predicate:      None,
            collect_errors: false,
        }
    }
}

impl FindBuilder {
    // ── What to walk ──────────────────────────────────────────────────────

    /// Directory to start from. Defaults to `.`.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Glob tested against each file's base name. Required.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Descend into subdirectories. Off by default: only the root's direct
    /// entries are visited.
    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    // ── Predicate ─────────────────────────────────────────────────────────

    /// Set the predicate called for every file and symlink.
    ///
    /// Defaults to [`ConsolePrinter`]. Pass an `Arc` to keep a handle for
    /// reading results after the run.
    pub fn with_predicate(mut self, p: impl Predicate + 'static) -> Self {
        self.predicate = Some(Arc::new(p));
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Number of worker slots, on top of the calling thread.
    ///
    /// `0` (the default) walks everything on the calling thread. At most
    /// [`MAX_CAPACITY`](crate::MAX_CAPACITY).
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = n;
        self
    }

    /// Verbosity of match output. Diagnostics follow whatever `tracing`
    /// subscriber the caller installed.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Longest full path, in bytes, that will be visited. Longer entries are
    /// skipped with [`FindError::PathTooLong`].
    pub fn max_path_len(mut self, max: usize) -> Self {
        self.max_path_len = max;
        self
    }

    /// Collect non-fatal errors into [`Results::errors`].
    ///
    /// Disabled by default. Errors are always logged either way.
    pub fn collect_errors(mut self, yes: bool) -> Self {
        self.collect_errors = yes;
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Walk the tree and return once every worker has been joined.
    ///
    /// The root is walked on the calling thread; subdirectories are offloaded
    /// to worker slots while any are free.
    ///
    /// # Errors
    ///
    /// Configuration errors ([`FindError::InvalidPattern`],
    /// [`FindError::CapacityExceeded`]) before anything is walked, and fatal
    /// runtime errors ([`FindError::LockFailure`], [`FindError::WorkerSpawn`])
    /// after all started workers have been joined. An unreadable root, or one
    /// that is not a directory itself (a symlink to one included), is not an
    /// error: it shows up as [`WalkStatus::Unavailable`] in the results.
    ///
    /// # Panics
    ///
    /// A panic raised by the predicate on the calling thread is re-raised,
    /// but only after every worker has stopped and been joined.
    pub fn run(self) -> Result<Results, FindError> {
        let settings = MatchSettings::new(self.pattern.unwrap_or_default(), self.recursive, self.log_level)?
            .with_max_path_len(self.max_path_len);
        let pool = Arc::new(SlotPool::new(self.threads)?);

        let predicate: Arc<dyn Predicate> = match self.predicate {
            Some(p) => p,
            None    => Arc::new(ConsolePrinter),
        };
        let tally = Arc::new(Tally::new(self.collect_errors));
        let root = self.root.unwrap_or_else(|| PathBuf::from("."));

        debug!(
            root = %root.display(),
            pattern = settings.pattern(),
            recursive = settings.recursive(),
            capacity = pool.capacity(),
            "starting traversal"
        );

        let start = Instant::now();
        let ctx = TraversalContext::root(
            Arc::new(settings),
            DirEntryInfo::root(root),
            predicate,
            Arc::clone(&pool),
            Arc::clone(&tally),
        );

        let walked = if root_is_directory(&ctx) {
            panic::catch_unwind(AssertUnwindSafe(|| walker::walk(&ctx)))
        } else {
            Ok(Ok(WalkStatus::Unavailable))
        };
        drop(ctx);

        let status = match walked {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                error!("{err}");
                tally.abort(err);
                WalkStatus::Aborted
            }
            Err(payload) => {
                error!("predicate panicked on the calling thread, stopping workers");
                tally.halt();
                if let Err(err) = pool.join_busy() {
                    error!("{err}");
                }
                panic::resume_unwind(payload);
            }
        };

        debug!("waiting on active workers");
        let summary = pool.join_busy()?;
        for slot in summary.panicked {
            error!(%slot, "worker panicked");
            tally.record(FindError::WorkerPanicked { slot: slot.index() });
        }
        debug!(joined = summary.joined, "all workers done");

        if let Some(err) = tally.take_fatal() {
            return Err(err);
        }

        Ok(Results {
            status,
            stats: ScanStats::compute(tally.files(), tally.dirs(), start.elapsed()),
            errors: tally.take_errors(),
            pool: pool.snapshot(),
        })
    }
}

/// `lstat` the root. Anything that exists but is not a real directory is
/// logged, recorded and not walked; a root that cannot be stat'ed is left to
/// the walker, which reports it like any unopenable directory.
fn root_is_directory(ctx: &TraversalContext) -> bool {
    let path: &Path = &ctx.dir.path;
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.file_type().is_dir() => {
            let err = FindError::NotADirectory(path.to_path_buf());
            error!("{err}");
            ctx.tally.record(err);
            false
        }
        _ => true,
    }
}
