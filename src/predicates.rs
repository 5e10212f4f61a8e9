use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::trace;

use crate::entry::DirEntryInfo;
use crate::settings::{LogLevel, MatchSettings};
use crate::traits::Predicate;

// ---------------------------------------------------------------------------
// ConsolePrinter
// ---------------------------------------------------------------------------

/// Prints the full path of every entry whose name matches the pattern, one
/// per line on stdout. Used by the `parfind` binary.
///
/// Printing happens at NORMAL level: with the log level at `error` or `off`
/// matches are evaluated but nothing is written.
#[derive(Debug, Default)]
pub struct ConsolePrinter;

impl Predicate for ConsolePrinter {
    fn visit(&self, settings: &MatchSettings, entry: &DirEntryInfo) {
        if !settings.is_match(&entry.name) {
            trace!(
                pattern = settings.pattern(),
                path = %entry.path.display(),
                "no match"
            );
            return;
        }

        if !LogLevel::Normal.enabled_at(settings.log_level()) {
            return;
        }

        // Lock per line so concurrent workers never interleave a path.
        let mut out = io::stdout().lock();
        if let Err(e) = write_path(&mut out, &entry.path) {
            trace!(error = %e, "stdout write failed");
        }
    }
}

/// Write `path` and a newline, byte for byte where the platform allows it, so
/// names that are not valid UTF-8 come out as the file they name.
#[cfg(unix)]
fn write_path(out: &mut impl Write, path: &Path) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;

    out.write_all(path.as_os_str().as_bytes())?;
    out.write_all(b"\n")
}

#[cfg(not(unix))]
fn write_path(out: &mut impl Write, path: &Path) -> io::Result<()> {
    writeln!(out, "{}", path.display())
}

// ---------------------------------------------------------------------------
// MatchCounter
// ---------------------------------------------------------------------------

/// Counts visited and matching entries.
#[derive(Debug, Default)]
pub struct MatchCounter {
    visited: AtomicUsize,
    matched: AtomicUsize,
}

impl MatchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries the predicate was called with.
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::Relaxed)
    }

    /// Entries whose name matched the pattern.
    pub fn matched(&self) -> usize {
        self.matched.load(Ordering::Relaxed)
    }
}

impl Predicate for MatchCounter {
    fn visit(&self, settings: &MatchSettings, entry: &DirEntryInfo) {
        self.visited.fetch_add(1, Ordering::Relaxed);
        if settings.is_match(&entry.name) {
            self.matched.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ---------------------------------------------------------------------------
// MatchCollector
// ---------------------------------------------------------------------------

/// Records a `(path, matched)` pair for every visited entry, in the order the
/// workers reported them.
#[derive(Debug, Default)]
pub struct MatchCollector {
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl MatchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every visited entry with its match outcome.
    pub fn entries(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Paths of matching entries only.
    pub fn matches(&self) -> Vec<PathBuf> {
        self.entries()
            .into_iter()
            .filter_map(|(path, matched)| matched.then_some(path))
            .collect()
    }
}

impl Predicate for MatchCollector {
    fn visit(&self, settings: &MatchSettings, entry: &DirEntryInfo) {
        let matched = settings.is_match(&entry.name);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((entry.path.clone(), matched));
        }
    }
}
