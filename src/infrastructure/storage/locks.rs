//! Per-slot exclusive locks
//!
//! One async mutex per slot ID, created on first use. Guards are owned so
//! they can travel inside a boxed `SlotTransaction`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Clone, Default)]
pub struct SlotLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `slot_id`.
    pub async fn acquire(&self, slot_id: i64) -> OwnedMutexGuard<()> {
        // Clone the mutex out so the map shard is not held across the await.
        let lock = Arc::clone(self.locks.entry(slot_id).or_default().value());
        let guard = lock.lock_owned().await;
        trace!(slot_id, "Slot lock acquired");
        guard
    }

    /// Number of slots that have ever been locked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
