//! Per-key async locks

use crate::keys::KeyStem;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub type KeyGuard = OwnedMutexGuard<()>;

/// Lock table keyed by stem. Entries are created on demand and pruned once
/// nobody holds or waits on them.
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<KeyStem, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn get(&self, stem: &KeyStem) -> Arc<Mutex<()>> {
        self.locks
            .entry(stem.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn try_lock(&self, stem: &KeyStem) -> Option<KeyGuard> {
        self.get(stem).try_lock_owned().ok()
    }

    /// Remove lock entries nobody references. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(&*lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }
}
