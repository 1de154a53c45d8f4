//! Shared helpers for cache operations

use crate::catalog::{EntryInfo, InsertOutcome, KeyGuard};
use crate::epoch::Epoch;
use crate::errors::{CacheError, Result};
use crate::expiration::ExpirationPolicy;
use crate::keys::KeyStem;
use crate::streaming::{CacheReader, Staged};
use filestash_utils::tracing::cache_event;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::super::types::CacheInner;

/// Fail fast when the token already fired
#[inline]
pub(crate) fn check_cancelled(cancel: &CancellationToken, operation: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        Err(CacheError::cancelled(operation))
    } else {
        Ok(())
    }
}

/// A file renamed into `objects/`
#[derive(Debug)]
pub(crate) struct Committed {
    pub path: PathBuf,
    pub info: EntryInfo,
}

impl CacheInner {
    /// Wait for the key lock unless cancelled first
    pub(crate) async fn lock_key(
        &self,
        stem: &KeyStem,
        cancel: &CancellationToken,
        operation: &'static str,
    ) -> Result<KeyGuard> {
        let lock = self.catalog.key_lock(stem);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CacheError::cancelled(operation)),
            guard = lock.lock_owned() => Ok(guard),
        }
    }

    /// Open the committed file of a catalog entry and record the access.
    ///
    /// A catalog entry whose file is missing reads as a miss; the collector
    /// drops the entry later.
    pub(crate) async fn open_entry(
        &self,
        stem: &KeyStem,
        operation: &'static str,
    ) -> Result<Option<CacheReader>> {
        let found = match self.catalog.lookup(stem) {
            Some(found) => found,
            None => {
                self.stats.record_miss();
                cache_event(stem.as_str(), false, operation);
                return Ok(None);
            }
        };

        match CacheReader::open(found.path, found.info).await? {
            Some(reader) => {
                self.catalog.log_access(stem, SystemTime::now());
                self.stats.record_hit();
                cache_event(stem.as_str(), true, operation);
                Ok(Some(reader))
            }
            None => {
                debug!(stem = %stem, "catalog entry has no committed file");
                self.stats.record_miss();
                cache_event(stem.as_str(), false, operation);
                Ok(None)
            }
        }
    }

    /// Rename a staged file onto its canonical name and publish it.
    ///
    /// The caller holds the key lock. If the epoch was invalidated while the
    /// content was staged the file is committed into the retired epoch but
    /// not published.
    pub(crate) async fn commit(
        &self,
        epoch: &Epoch,
        stem: &KeyStem,
        staged: Staged,
        policy: Option<Box<dyn ExpirationPolicy>>,
        cancel: &CancellationToken,
    ) -> Result<Committed> {
        if cancel.is_cancelled() {
            staged.discard().await;
            return Err(CacheError::cancelled("commit"));
        }

        let path = epoch.committed_path(stem);
        let info = staged.publish(&path, epoch).await?;
        self.stats.record_write(info.size_bytes);

        let outcome = self.catalog.insert(
            epoch.id(),
            stem.clone(),
            path.clone(),
            info.clone(),
            policy,
            SystemTime::now(),
        );
        match outcome {
            InsertOutcome::Inserted => {
                debug!(stem = %stem, size = info.size_bytes, "committed entry");
            }
            InsertOutcome::Replaced { merged } => {
                debug!(stem = %stem, size = info.size_bytes, merged, "replaced entry");
            }
            InsertOutcome::StaleEpoch => {
                debug!(stem = %stem, epoch = %epoch.id(), "epoch invalidated during write; entry not published");
            }
        }

        Ok(Committed { path, info })
    }

    /// Count failures other than cancellation
    pub(crate) fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !e.is_cancelled() {
                self.stats.record_error();
            }
        }
        result
    }
}
