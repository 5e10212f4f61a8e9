//! # parfind
//!
//! Recursive directory traversal over a fixed pool of worker slots.
//!
//! parfind walks a directory tree and hands every file and symlink it finds
//! to a [`Predicate`]. Subdirectories are offloaded to worker threads while a
//! slot is free and walked inline on the discovering thread when none is, so
//! at most `threads + 1` threads ever do traversal work and there is no
//! pending-work queue to grow.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use parfind::MatchCounter;
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("a.txt"), "").unwrap();
//! std::fs::create_dir(dir.path().join("sub")).unwrap();
//! std::fs::write(dir.path().join("sub").join("b.txt"), "").unwrap();
//! std::fs::write(dir.path().join("sub").join("c.md"), "").unwrap();
//!
//! let counter = Arc::new(MatchCounter::new());
//! let results = parfind::find()
//!     .root(dir.path())
//!     .pattern("*.txt")
//!     .recursive(true)
//!     .threads(2)
//!     .with_predicate(Arc::clone(&counter))
//!     .run()
//!     .unwrap();
//!
//! assert!(results.is_success());
//! assert_eq!(counter.visited(), 3);
//! assert_eq!(counter.matched(), 2);
//! ```
//!
//! # Custom Predicates
//!
//! Matching is the predicate's job. The walker calls it for every candidate
//! entry, matching or not:
//!
//! ```rust
//! use parfind::{DirEntryInfo, MatchSettings, Predicate};
//!
//! struct Shout;
//!
//! impl Predicate for Shout {
//!     fn visit(&self, settings: &MatchSettings, entry: &DirEntryInfo) {
//!         if settings.is_match(&entry.name) {
//!             println!("FOUND {}", entry.path.display());
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]

mod builder;
mod context;
mod dispatch;
mod entry;
mod error;
mod pool;
mod predicates;
mod results;
mod settings;
mod traits;
mod walker;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::FindBuilder;
pub use entry::{DirEntryInfo, EntryKind};
pub use error::FindError;
pub use pool::{JoinSummary, PoolGuard, PoolSnapshot, SlotId, SlotOwner, SlotPool, MAX_CAPACITY};
pub use predicates::{ConsolePrinter, MatchCollector, MatchCounter};
pub use results::{Results, ScanStats, WalkStatus};
pub use settings::{LogLevel, MatchSettings, MAX_PATH_LEN};
pub use traits::Predicate;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`FindBuilder`] to configure and run a traversal.
///
/// # Example
///
/// ```rust
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("notes.md"), "").unwrap();
///
/// let results = parfind::find()
///     .root(dir.path())
///     .pattern("*.md")
///     .with_predicate(parfind::MatchCounter::new())
///     .run()
///     .unwrap();
///
/// assert_eq!(results.stats.files, 1);
/// ```
pub fn find() -> FindBuilder {
    FindBuilder::default()
}
