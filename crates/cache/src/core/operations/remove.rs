//! Invalidation of single keys and discarding of committed files

use crate::epoch::graveyard_for;
use crate::errors::Result;
use crate::keys::KeyStem;
use filestash_utils::tracing::cache_span;
use filestash_utils::{remove_file, Removal};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use super::super::types::{CacheInner, FileCache};
use super::utils::check_cancelled;

/// What happened to a committed file that was asked to go away
#[derive(Debug)]
pub(crate) enum Discard {
    Removed,
    /// Still open; moved out of `objects/` into the graveyard
    Buried(PathBuf),
    /// Still open and could not be moved; stays an orphan
    Deferred(io::Error),
    Failed(io::Error),
}

impl<K> FileCache<K>
where
    K: Serialize + ?Sized,
{
    /// Remove the entry for `key`. Returns whether an entry was present.
    ///
    /// Readers that already hold the file keep reading the old content.
    pub async fn invalidate(&self, key: &K, cancel: &CancellationToken) -> Result<bool> {
        let result = async {
            check_cancelled(cancel, "invalidate")?;
            let stem = KeyStem::of(key)?;
            self.invalidate_stem(&stem, cancel)
                .instrument(cache_span("invalidate", stem.as_str()))
                .await
        }
        .await;
        self.inner.track(result)
    }

    async fn invalidate_stem(&self, stem: &KeyStem, cancel: &CancellationToken) -> Result<bool> {
        let _guard = self.inner.lock_key(stem, cancel, "invalidate").await?;
        let path = match self.inner.catalog.remove(stem) {
            Some(path) => path,
            None => return Ok(false),
        };
        self.inner.stats.record_invalidation();

        match self.inner.discard_committed(&path).await {
            Discard::Removed | Discard::Buried(_) => {}
            Discard::Deferred(e) | Discard::Failed(e) => {
                // Left as an orphan for the collector
                debug!(path = %path.display(), error = %e, "could not delete invalidated file");
            }
        }
        Ok(true)
    }
}

impl CacheInner {
    /// Delete a committed file, or at least move it off its canonical name.
    ///
    /// The caller holds the key lock and has already unpublished the entry.
    pub(crate) async fn discard_committed(&self, path: &Path) -> Discard {
        let error = match remove_file(path).await {
            Removal::Removed => return Discard::Removed,
            Removal::InUse(e) | Removal::Failed(e) => e,
        };

        let in_use = filestash_utils::is_in_use(&error);
        if let Some(grave) = graveyard_for(path) {
            match tokio::fs::rename(path, &grave).await {
                Ok(()) => {
                    debug!(from = %path.display(), to = %grave.display(), "moved busy file to graveyard");
                    return Discard::Buried(grave);
                }
                Err(e)
                    if e.kind() == io::ErrorKind::NotFound
                        && !tokio::fs::try_exists(path).await.unwrap_or(true) =>
                {
                    return Discard::Removed;
                }
                Err(_) => {}
            }
        }

        if in_use {
            Discard::Deferred(error)
        } else {
            Discard::Failed(error)
        }
    }
}
