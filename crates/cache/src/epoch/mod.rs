//! Epoch store
//!
//! All cache content lives under an epoch directory. Invalidating everything
//! swaps in a fresh epoch; the old one is retired and deleted by the garbage
//! collector once no in-flight operation still holds it.

mod layout;

pub use layout::{Epoch, EpochId, GRAVEYARD_DIR, MAX_PATH_OVERHEAD, OBJECTS_DIR, STAGING_DIR};
pub(crate) use layout::graveyard_for;

use crate::errors::{CacheError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct EpochStore {
    base_dir: PathBuf,
    current: RwLock<Arc<Epoch>>,
    retired: Mutex<HashMap<EpochId, Arc<Epoch>>>,
    /// Epochs created by [`prepare`](Self::prepare) and not yet installed
    pending: Mutex<HashSet<EpochId>>,
}

/// An epoch directory that is being set up to become current.
///
/// Discovery never retires it while this handle lives. Dropping the handle
/// without installing it leaves the directory to the collector.
pub struct PendingEpoch<'a> {
    store: &'a EpochStore,
    id: EpochId,
    epoch: Option<Epoch>,
}

impl PendingEpoch<'_> {
    pub fn id(&self) -> EpochId {
        self.id
    }

    pub fn root(&self) -> PathBuf {
        self.store.base_dir.join(self.id.to_string())
    }
}

impl Drop for PendingEpoch<'_> {
    fn drop(&mut self) {
        self.store.pending.lock().remove(&self.id);
    }
}

impl EpochStore {
    /// Create the base directory and a fresh current epoch.
    ///
    /// Every epoch directory left behind by an earlier process is retired.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        if let Err(e) = tokio::fs::create_dir_all(&base_dir).await {
            return Err(CacheError::io(base_dir, "create base directory", e));
        }

        let current = Epoch::create(&base_dir).await?;
        info!(
            base_dir = %base_dir.display(),
            epoch = %current.id(),
            "opened cache epoch"
        );

        let store = Self {
            base_dir,
            current: RwLock::new(Arc::new(current)),
            retired: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
        };
        let recovered = store.discover_retired().await?;
        if recovered > 0 {
            info!(count = recovered, "retired epochs from a previous run");
        }
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The epoch new writes go to
    pub fn current(&self) -> Arc<Epoch> {
        self.current.read().clone()
    }

    pub fn current_id(&self) -> EpochId {
        self.current.read().id()
    }

    pub fn is_current(&self, id: EpochId) -> bool {
        self.current_id() == id
    }

    /// Create the directory of the next epoch without installing it.
    ///
    /// The id is reserved before the directory exists, so a concurrent
    /// discovery pass cannot mistake it for a leftover.
    pub async fn prepare(&self) -> Result<PendingEpoch<'_>> {
        for _ in 0..layout::CREATE_ATTEMPTS {
            let id = EpochId::random();
            self.pending.lock().insert(id);
            let mut pending = PendingEpoch {
                store: self,
                id,
                epoch: None,
            };
            if let Some(epoch) = Epoch::create_new(&self.base_dir, id).await? {
                pending.epoch = Some(epoch);
                return Ok(pending);
            }
        }
        Err(layout::exhausted(&self.base_dir))
    }

    /// Make `next` current and retire the previous epoch.
    ///
    /// Performs no I/O; safe to call while holding other locks. Lock order is
    /// retired, current, pending.
    pub fn install(&self, mut next: PendingEpoch<'_>) -> EpochId {
        let next_id = next.id;
        let epoch = match next.epoch.take() {
            Some(epoch) => epoch,
            None => Epoch::existing(&self.base_dir, next_id),
        };

        let mut retired = self.retired.lock();
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(epoch));
        self.pending.lock().remove(&next_id);
        debug!(retired = %previous.id(), current = %next_id, "swapped epoch");
        retired.insert(previous.id(), previous);
        next_id
    }

    /// Register every epoch directory on disk that is neither current nor
    /// already retired. Returns how many were added.
    pub async fn discover_retired(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) => return Err(CacheError::io(self.base_dir.clone(), "scan base directory", e)),
        };

        let mut found = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(CacheError::io(self.base_dir.clone(), "scan base directory", e))
                }
            };
            let is_dir = match entry.file_type().await {
                Ok(file_type) => file_type.is_dir(),
                Err(_) => false,
            };
            if !is_dir {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(EpochId::parse) {
                found.push(id);
            }
        }

        // Same lock order as `install`, so an epoch is always either pending
        // or current while it is being swapped in
        let mut retired = self.retired.lock();
        let current = self.current_id();
        let pending = self.pending.lock();
        let mut added = 0;
        for id in found {
            if id == current || pending.contains(&id) || retired.contains_key(&id) {
                continue;
            }
            retired.insert(id, Arc::new(Epoch::existing(&self.base_dir, id)));
            added += 1;
        }
        Ok(added)
    }

    /// Retired epochs no operation holds a reference to
    pub fn unreferenced_retired(&self) -> Vec<Arc<Epoch>> {
        self.retired
            .lock()
            .values()
            .filter(|epoch| Arc::strong_count(*epoch) == 1)
            .cloned()
            .collect()
    }

    /// Number of retired epochs still awaiting deletion
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }

    /// Drop the bookkeeping for a retired epoch whose directory is gone
    pub fn forget(&self, id: EpochId) {
        self.retired.lock().remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_retires_previous_epochs() {
        let temp_dir = TempDir::new().unwrap();
        let stale = temp_dir.path().join("00000000000000aa");
        std::fs::create_dir_all(stale.join(OBJECTS_DIR)).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("not-an-epoch")).unwrap();

        let store = EpochStore::open(temp_dir.path()).await.unwrap();

        assert_eq!(store.retired_count(), 1);
        assert_ne!(store.current().root(), stale.as_path());
        assert!(store.current().objects_dir().is_dir());
    }

    #[tokio::test]
    async fn test_install_swaps_and_retires() {
        let temp_dir = TempDir::new().unwrap();
        let store = EpochStore::open(temp_dir.path()).await.unwrap();
        let before = store.current_id();

        let next = store.prepare().await.unwrap();
        let next_id = store.install(next);

        assert_ne!(before, next_id);
        assert!(store.is_current(next_id));
        assert!(!store.is_current(before));
        assert_eq!(store.retired_count(), 1);
    }

    #[tokio::test]
    async fn test_referenced_retired_epoch_is_not_offered() {
        let temp_dir = TempDir::new().unwrap();
        let store = EpochStore::open(temp_dir.path()).await.unwrap();
        let held = store.current();

        let next = store.prepare().await.unwrap();
        store.install(next);
        assert!(store.unreferenced_retired().is_empty());

        drop(held);
        let candidates = store.unreferenced_retired();
        assert_eq!(candidates.len(), 1);

        let id = candidates[0].id();
        drop(candidates);
        store.forget(id);
        assert_eq!(store.retired_count(), 0);
    }

    #[tokio::test]
    async fn test_discover_skips_pending_epoch() {
        let temp_dir = TempDir::new().unwrap();
        let store = EpochStore::open(temp_dir.path()).await.unwrap();

        let next = store.prepare().await.unwrap();
        assert!(next.root().join(OBJECTS_DIR).is_dir());
        assert_eq!(store.discover_retired().await.unwrap(), 0);
        assert!(store.unreferenced_retired().is_empty());

        let next_id = store.install(next);
        assert!(store.is_current(next_id));
        assert_eq!(store.discover_retired().await.unwrap(), 0);
        assert_eq!(store.retired_count(), 1);
        assert!(!store
            .unreferenced_retired()
            .iter()
            .any(|epoch| epoch.id() == next_id));
    }

    #[tokio::test]
    async fn test_abandoned_pending_epoch_is_discovered() {
        let temp_dir = TempDir::new().unwrap();
        let store = EpochStore::open(temp_dir.path()).await.unwrap();

        let next = store.prepare().await.unwrap();
        let abandoned = next.id();
        drop(next);

        assert_eq!(store.discover_retired().await.unwrap(), 1);
        assert!(store
            .unreferenced_retired()
            .iter()
            .any(|epoch| epoch.id() == abandoned));
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = EpochStore::open(temp_dir.path()).await.unwrap();

        std::fs::create_dir(temp_dir.path().join("00000000000000bb")).unwrap();
        assert_eq!(store.discover_retired().await.unwrap(), 1);
        assert_eq!(store.discover_retired().await.unwrap(), 0);
    }
}
