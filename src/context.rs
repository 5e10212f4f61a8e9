use std::ffi::OsStr;
use std::sync::Arc;

use crate::entry::{DirEntryInfo, EntryKind};
use crate::error::FindError;
use crate::pool::{SlotOwner, SlotPool};
use crate::results::Tally;
use crate::settings::MatchSettings;
use crate::traits::Predicate;

/// Everything needed to walk one directory, independent of which thread
/// ends up doing it.
///
/// Children share `settings`, `predicate`, `pool` and `tally` with their
/// parent and own their `dir`. A child is moved, never copied, into the
/// execution unit that runs it.
pub struct TraversalContext {
    pub settings:  Arc<MatchSettings>,
    pub dir:       DirEntryInfo,
    pub predicate: Arc<dyn Predicate>,
    pub pool:      Arc<SlotPool>,
    pub owner:     SlotOwner,
    pub(crate) tally: Arc<Tally>,
}

impl TraversalContext {
    pub(crate) fn root(
        settings: Arc<MatchSettings>,
        dir: DirEntryInfo,
        predicate: Arc<dyn Predicate>,
        pool: Arc<SlotPool>,
        tally: Arc<Tally>,
    ) -> Self {
        Self {
            settings,
            dir,
            predicate,
            pool,
            owner: SlotOwner::Main,
            tally,
        }
    }

    /// Describe the entry `name` inside this context's directory.
    ///
    /// # Errors
    ///
    /// [`FindError::PathTooLong`] if the joined path exceeds the configured
    /// limit. The path is never truncated.
    pub fn entry(&self, name: &OsStr, kind: EntryKind) -> Result<DirEntryInfo, FindError> {
        let path = self.dir.path.join(name);
        let len = path.as_os_str().len();
        let max = self.settings.max_path_len();
        if len > max {
            return Err(FindError::PathTooLong { path, len, max });
        }

        Ok(DirEntryInfo {
            path,
            name: name.to_os_string(),
            kind,
            depth: self.dir.depth + 1,
        })
    }

    /// A context for walking `dir`, run by whoever runs this one until the
    /// dispatcher says otherwise.
    pub fn child(&self, dir: DirEntryInfo) -> Self {
        Self {
            settings:  Arc::clone(&self.settings),
            dir,
            predicate: Arc::clone(&self.predicate),
            pool:      Arc::clone(&self.pool),
            owner:     self.owner,
            tally:     Arc::clone(&self.tally),
        }
    }
}
