//! In-memory catalog of committed entries
//!
//! Maps a key stem to the committed file, its metadata and its expiration
//! policy. The catalog also remembers which epoch it indexes, so a writer
//! that raced with a full invalidation cannot publish into the new view.

mod entry;
mod locks;


pub use entry::{EntryInfo, InsertOutcome, Lookup};
pub use locks::KeyGuard;

pub(crate) use entry::CatalogEntry;

use crate::epoch::EpochId;
use crate::expiration::ExpirationPolicy;
use crate::keys::KeyStem;
use locks::KeyLocks;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

struct CatalogState {
    epoch: EpochId,
    entries: HashMap<KeyStem, CatalogEntry>,
}

pub struct Catalog {
    state: RwLock<CatalogState>,
    locks: KeyLocks,
}

impl Catalog {
    pub fn new(epoch: EpochId) -> Self {
        Self {
            state: RwLock::new(CatalogState {
                epoch,
                entries: HashMap::new(),
            }),
            locks: KeyLocks::default(),
        }
    }

    /// Epoch whose entries the catalog currently indexes
    pub fn epoch(&self) -> EpochId {
        self.state.read().epoch
    }

    pub fn lookup(&self, stem: &KeyStem) -> Option<Lookup> {
        self.state.read().entries.get(stem).map(|entry| Lookup {
            path: entry.path.clone(),
            info: entry.info.clone(),
        })
    }

    pub fn contains(&self, stem: &KeyStem) -> bool {
        self.state.read().entries.contains_key(stem)
    }

    /// Record a read. Returns `false` when the entry is gone.
    pub fn log_access(&self, stem: &KeyStem, now: SystemTime) -> bool {
        let mut state = self.state.write();
        match state.entries.get_mut(stem) {
            Some(entry) => {
                if let Some(policy) = entry.policy.as_mut() {
                    policy.log_access(now);
                }
                true
            }
            None => false,
        }
    }

    /// Publish a committed file.
    ///
    /// The new policy absorbs the policy of a replaced entry when the two
    /// merge; otherwise it replaces it. The resulting policy is then told
    /// about the write as an access.
    pub fn insert(
        &self,
        epoch: EpochId,
        stem: KeyStem,
        path: PathBuf,
        info: EntryInfo,
        mut policy: Option<Box<dyn ExpirationPolicy>>,
        now: SystemTime,
    ) -> InsertOutcome {
        let mut state = self.state.write();
        if state.epoch != epoch {
            return InsertOutcome::StaleEpoch;
        }

        let previous = state.entries.get(&stem);
        let merged = match (policy.as_mut(), previous.and_then(|e| e.policy.as_deref())) {
            (Some(new), Some(old)) => new.try_merge(old),
            _ => false,
        };
        if let Some(policy) = policy.as_mut() {
            policy.log_access(now);
        }

        let replaced = state
            .entries
            .insert(stem, CatalogEntry { path, info, policy })
            .is_some();
        if replaced {
            InsertOutcome::Replaced { merged }
        } else {
            InsertOutcome::Inserted
        }
    }

    /// Remove an entry, returning the path of its committed file
    pub fn remove(&self, stem: &KeyStem) -> Option<PathBuf> {
        self.state.write().entries.remove(stem).map(|entry| entry.path)
    }

    /// Remove an entry if it is still expired at `now`
    pub fn remove_expired(&self, stem: &KeyStem, now: SystemTime) -> Option<PathBuf> {
        let mut state = self.state.write();
        let expired = state
            .entries
            .get(stem)
            .is_some_and(|entry| entry.is_expired(now));
        if expired {
            state.entries.remove(stem).map(|entry| entry.path)
        } else {
            None
        }
    }

    /// Remove an entry if it still points at `path`
    pub fn remove_if_path(&self, stem: &KeyStem, path: &Path) -> bool {
        let mut state = self.state.write();
        let matches = state
            .entries
            .get(stem)
            .is_some_and(|entry| entry.path == path);
        if matches {
            state.entries.remove(stem);
        }
        matches
    }

    /// Stems of entries whose policy reports expiry at `now`
    pub fn expired(&self, now: SystemTime) -> Vec<KeyStem> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(stem, _)| stem.clone())
            .collect()
    }

    /// Snapshot of every entry's committed path
    pub fn paths(&self) -> Vec<(KeyStem, PathBuf)> {
        self.state
            .read()
            .entries
            .iter()
            .map(|(stem, entry)| (stem.clone(), entry.path.clone()))
            .collect()
    }

    /// Drop every entry and switch to the epoch returned by `install`.
    ///
    /// `install` runs under the catalog's write lock, so no insert can land
    /// between the epoch swap and the clear. Returns the number of entries
    /// dropped.
    pub fn reset(&self, install: impl FnOnce() -> EpochId) -> usize {
        let mut state = self.state.write();
        let dropped = state.entries.len();
        state.epoch = install();
        state.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Lock guarding publication and deletion of a key's committed file
    pub fn key_lock(&self, stem: &KeyStem) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.get(stem)
    }

    pub fn try_lock_key(&self, stem: &KeyStem) -> Option<KeyGuard> {
        self.locks.try_lock(stem)
    }

    /// Forget idle key locks
    pub fn prune_locks(&self) -> usize {
        self.locks.prune()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
