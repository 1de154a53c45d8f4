//! Cache construction

use crate::catalog::Catalog;
use crate::config::CacheConfig;
use crate::epoch::EpochStore;
use crate::errors::Result;
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::sync::Arc;

use super::cleanup::start_collection_task;
use super::internal::CacheStats;
use super::types::{CacheInner, FileCache};

impl<K: ?Sized> FileCache<K> {
    /// Open a cache rooted at `config.base_dir`.
    ///
    /// Starts in a fresh epoch: anything left under the base directory by an
    /// earlier process is unreachable and gets reclaimed by the collector.
    /// The background collector is started when `gc_interval` is set, which
    /// requires a Tokio runtime.
    pub async fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let epochs = EpochStore::open(config.base_dir.clone()).await?;
        let catalog = Catalog::new(epochs.current_id());

        let inner = Arc::new(CacheInner {
            config,
            epochs,
            catalog,
            stats: CacheStats::default(),
            gc_gate: tokio::sync::Mutex::new(()),
            cleanup_handle: RwLock::new(None),
        });
        start_collection_task(&inner);

        Ok(Self {
            inner,
            _key: PhantomData,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }
}
