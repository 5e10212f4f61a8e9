use std::sync::Arc;
use std::thread;

use tracing::{debug, error, trace};

use crate::context::TraversalContext;
use crate::error::FindError;
use crate::pool::{SlotId, SlotOwner, SlotPool};
use crate::walker;

/// Run `child` on a free worker slot, or inline when the pool is saturated.
///
/// Never waits for the child. On offload the child is moved into a new
/// worker thread and this returns as soon as the worker is bound to its
/// slot; otherwise the child is walked to completion on the calling thread
/// (that is the backpressure: no queue, no dropped work). The child's
/// [`WalkStatus`](crate::WalkStatus) is not reported back.
///
/// # Errors
///
/// [`FindError::LockFailure`] if the pool lock is poisoned,
/// [`FindError::WorkerSpawn`] if the OS refuses a new thread. Both are fatal.
pub fn offer(mut child: TraversalContext) -> Result<(), FindError> {
    let pool = Arc::clone(&child.pool);
    let mut guard = pool.lock()?;

    if guard.available_count() > 0 {
        match guard.acquire_free_slot() {
            Some(slot) => {
                guard.mark_busy(slot);
                child.owner = SlotOwner::Worker(slot);
                let dir = child.dir.path.clone();

                let spawned = thread::Builder::new()
                    .name(format!("parfind-slot-{}", slot.index()))
                    .spawn(move || run_worker(child));

                return match spawned {
                    Ok(handle) => {
                        guard.bind_worker(slot, handle);
                        debug!(
                            %slot,
                            dir = %dir.display(),
                            available = guard.available_count(),
                            "offloaded directory"
                        );
                        Ok(())
                    }
                    Err(source) => {
                        guard.mark_available(slot);
                        Err(FindError::WorkerSpawn { slot: slot.index(), source })
                    }
                };
            }
            None => debug!(
                available = guard.available_count(),
                capacity = pool.capacity(),
                "available count set but no free slot found"
            ),
        }
    }

    drop(guard);
    trace!(dir = %child.dir.path.display(), owner = %child.owner, "walking inline");
    walker::walk(&child)?;
    Ok(())
}

/// Worker entry point: walk, then give the slot back.
///
/// The slot is released by a drop guard, so a panicking predicate still
/// frees it before the thread dies.
fn run_worker(ctx: TraversalContext) {
    let SlotOwner::Worker(slot) = ctx.owner else {
        return;
    };
    let _release = SlotRelease {
        pool: Arc::clone(&ctx.pool),
        slot,
    };

    debug!(%slot, dir = %ctx.dir.path.display(), "worker started");
    match walker::walk(&ctx) {
        Ok(status) => debug!(%slot, ?status, "worker finished"),
        Err(err) => {
            error!(%slot, "{err}");
            ctx.tally.abort(err);
        }
    }
}

struct SlotRelease {
    pool: Arc<SlotPool>,
    slot: SlotId,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}
