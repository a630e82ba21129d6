use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Hands out execution ids for a whole run.
///
/// Released ids go back to a free list and the lowest is reused first, so ids
/// stay within `1..=peak concurrency`.
#[derive(Debug, Default)]
pub(crate) struct VuRegistry {
    free: Mutex<BTreeSet<u64>>,
    allocated: AtomicU64,
    running: AtomicU64,
}

impl VuRegistry {
    pub(crate) fn lease(self: &Arc<Self>) -> VuLease {
        let reused = {
            let mut free = self.free.lock();
            free.pop_first()
        };
        let id = reused.unwrap_or_else(|| {
            self.allocated
                .fetch_add(1, Ordering::SeqCst)
                .saturating_add(1)
        });
        self.running.fetch_add(1, Ordering::SeqCst);
        VuLease {
            id,
            registry: Arc::clone(self),
        }
    }

    /// Executions currently holding an id.
    pub(crate) fn running(&self) -> u64 {
        self.running.load(Ordering::SeqCst)
    }

    /// Distinct ids ever handed out; the peak concurrency of the run.
    pub(crate) fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::SeqCst)
    }

    fn release(&self, id: u64) {
        self.free.lock().insert(id);
        // Every lease increments once before its single release.
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An execution id, returned to the registry on drop.
#[derive(Debug)]
pub(crate) struct VuLease {
    id: u64,
    registry: Arc<VuRegistry>,
}

impl VuLease {
    pub(crate) const fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for VuLease {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
