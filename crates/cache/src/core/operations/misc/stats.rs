//! Statistics and introspection

use std::path::{Path, PathBuf};

use super::super::super::internal::CacheStatistics;
use super::super::super::types::FileCache;

impl<K: ?Sized> FileCache<K> {
    /// Snapshot of the cache counters
    pub fn statistics(&self) -> CacheStatistics {
        self.inner.stats.snapshot(self.inner.catalog.len())
    }

    /// Number of published entries
    pub fn len(&self) -> usize {
        self.inner.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.catalog.is_empty()
    }

    pub fn base_dir(&self) -> &Path {
        self.inner.epochs.base_dir()
    }

    /// Directory of the epoch new entries are written to
    pub fn current_epoch_dir(&self) -> PathBuf {
        self.inner.epochs.current().root().to_path_buf()
    }
}
