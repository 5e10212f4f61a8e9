use std::ffi::OsStr;
use std::fs;

use tracing::{debug, error, trace};

use crate::context::TraversalContext;
use crate::dispatch;
use crate::entry::{DirEntryInfo, EntryKind};
use crate::error::FindError;
use crate::results::WalkStatus;

/// Walk the directory described by `ctx`.
///
/// Files and symlinks go to the predicate inline. Subdirectories (when
/// recursive) are offered to the dispatcher, which either hands them to a
/// worker or walks them right here before the listing continues.
///
/// A directory that cannot be opened is logged, recorded and reported as
/// [`WalkStatus::Unavailable`]; it never affects siblings or parents, and a
/// child's status is never folded into its parent's.
///
/// # Errors
///
/// Only fatal conditions (poisoned pool lock, worker spawn failure) are
/// returned as `Err`.
pub fn walk(ctx: &TraversalContext) -> Result<WalkStatus, FindError> {
    debug!(dir = %ctx.dir.path.display(), owner = %ctx.owner, "visiting directory");

    let entries = match fs::read_dir(&ctx.dir.path) {
        Ok(entries) => entries,
        Err(source) => {
            error!(path = %ctx.dir.path.display(), error = %source, "could not access directory");
            ctx.tally.record(FindError::DirectoryUnavailable {
                path: ctx.dir.path.clone(),
                source,
            });
            return Ok(WalkStatus::Unavailable);
        }
    };
    ctx.tally.count_dir();

    for entry in entries {
        if ctx.tally.is_aborted() {
            debug!(dir = %ctx.dir.path.display(), "traversal aborted");
            return Ok(WalkStatus::Aborted);
        }

        // Entries can vanish between the listing and the type lookup; skip just
        // that one.
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                trace!(dir = %ctx.dir.path.display(), error = %e, "unreadable entry");
                continue;
            }
        };

        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }

        let kind = match entry.file_type() {
            Ok(ft) => EntryKind::from(ft),
            Err(e) => {
                trace!(path = %entry.path().display(), error = %e, "could not read entry type");
                continue;
            }
        };

        match kind {
            EntryKind::File | EntryKind::Symlink => {
                let Some(info) = describe(ctx, &name, kind) else { continue };
                trace!(path = %info.path.display(), "file entry");
                ctx.predicate.visit(&ctx.settings, &info);
                ctx.tally.count_file();
            }
            EntryKind::Dir => {
                if !ctx.settings.recursive() {
                    continue;
                }
                let Some(info) = describe(ctx, &name, kind) else { continue };
                trace!(path = %info.path.display(), "directory entry");
                dispatch::offer(ctx.child(info))?;
            }
            EntryKind::Other => {}
        }
    }

    Ok(WalkStatus::Completed)
}

/// Build the entry info, logging and recording an over-long path.
fn describe(ctx: &TraversalContext, name: &OsStr, kind: EntryKind) -> Option<DirEntryInfo> {
    match ctx.entry(name, kind) {
        Ok(info) => Some(info),
        Err(err) => {
            error!("{err}");
            ctx.tally.record(err);
            None
        }
    }
}
