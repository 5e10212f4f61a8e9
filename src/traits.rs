use std::sync::Arc;

use crate::entry::DirEntryInfo;
use crate::settings::MatchSettings;

/// Called once for every regular file and symlink the walker finds.
///
/// The walker never decides what "matches": it hands every candidate entry
/// to the predicate, which applies whatever matching logic it wants (glob,
/// extension, metadata) and records or prints the outcome.
///
/// # Thread Safety
///
/// `Send + Sync` are required: the predicate is shared by every worker and
/// called concurrently on different entries. Implementations that write to a
/// shared sink must serialize internally.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use parfind::{DirEntryInfo, MatchSettings, Predicate};
///
/// struct RustFiles(AtomicUsize);
///
/// impl Predicate for RustFiles {
///     fn visit(&self, _settings: &MatchSettings, entry: &DirEntryInfo) {
///         if entry.path.extension().map(|e| e == "rs").unwrap_or(false) {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait Predicate: Send + Sync {
    /// Inspect one entry. Must not block on other traversals.
    fn visit(&self, settings: &MatchSettings, entry: &DirEntryInfo);
}

/// Lets callers keep a handle on a predicate (to read its counts after the
/// run) while the walk owns another.
impl<P: Predicate + ?Sized> Predicate for Arc<P> {
    fn visit(&self, settings: &MatchSettings, entry: &DirEntryInfo) {
        (**self).visit(settings, entry)
    }
}
