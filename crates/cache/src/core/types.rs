//! Core cache types

use crate::catalog::Catalog;
use crate::config::CacheConfig;
use crate::epoch::EpochStore;
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::internal::CacheStats;

/// Keyed cache of immutable files.
///
/// Keys are any `serde::Serialize` type; two keys are equal when their
/// bincode encodings are. Clones share the same underlying cache.
pub struct FileCache<K: ?Sized> {
    pub(super) inner: Arc<CacheInner>,
    pub(super) _key: PhantomData<fn(&K)>,
}

pub(crate) struct CacheInner {
    pub config: CacheConfig,
    pub epochs: EpochStore,
    pub catalog: Catalog,
    pub stats: CacheStats,
    /// Serializes collection passes
    pub gc_gate: tokio::sync::Mutex<()>,
    /// Background collection task handle
    pub cleanup_handle: RwLock<Option<JoinHandle<()>>>,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.write().take() {
            handle.abort();
        }
    }
}

impl<K: ?Sized> Clone for FileCache<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _key: PhantomData,
        }
    }
}

impl<K: ?Sized> std::fmt::Debug for FileCache<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("base_dir", &self.inner.epochs.base_dir())
            .field("epoch", &self.inner.epochs.current_id())
            .field("entry_count", &self.inner.catalog.len())
            .finish()
    }
}
