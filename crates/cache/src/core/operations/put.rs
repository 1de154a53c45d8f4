//! Unconditional writes

use crate::catalog::EntryInfo;
use crate::errors::{CacheError, Result};
use crate::expiration::ExpirationPolicy;
use crate::keys::KeyStem;
use crate::streaming::stage_from;
use filestash_utils::tracing::cache_span;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::super::types::FileCache;
use super::get::open_source;
use super::utils::check_cancelled;

impl<K> FileCache<K>
where
    K: Serialize + ?Sized,
{
    /// Store `source` under `key`, replacing any existing entry.
    ///
    /// The content is staged before the key lock is taken, so readers of the
    /// old entry are never blocked by a slow source.
    pub async fn add_or_update_stream<R>(
        &self,
        key: &K,
        mut source: R,
        cancel: &CancellationToken,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<EntryInfo>
    where
        R: AsyncRead + Unpin,
    {
        let result = async {
            check_cancelled(cancel, "add_or_update")?;
            let stem = KeyStem::of(key)?;
            self.store(&stem, &mut source, cancel, policy)
                .instrument(cache_span("add_or_update", stem.as_str()))
                .await
        }
        .await;
        self.inner.track(result)
    }

    /// Store the content of the file at `source` under `key`
    pub async fn add_or_update_from_path(
        &self,
        key: &K,
        source: &Path,
        cancel: &CancellationToken,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<EntryInfo> {
        let opened = async {
            check_cancelled(cancel, "add_or_update")?;
            open_source(source.to_path_buf()).await
        }
        .await;
        let file = self.inner.track(opened)?;
        self.add_or_update_stream(key, file, cancel, policy).await
    }

    async fn store<R>(
        &self,
        stem: &KeyStem,
        source: &mut R,
        cancel: &CancellationToken,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<EntryInfo>
    where
        R: AsyncRead + Unpin,
    {
        let inner = &self.inner;
        let epoch = inner.epochs.current();
        let staged = stage_from(
            &epoch,
            stem,
            source,
            cancel,
            inner.config.buffer_size,
            inner.config.sync_on_commit,
        )
        .await?;

        let _guard = match inner.lock_key(stem, cancel, "add_or_update").await {
            Ok(guard) => guard,
            Err(e) => {
                staged.discard().await;
                return Err(e);
            }
        };
        let committed = inner.commit(&epoch, stem, staged, policy, cancel).await?;
        Ok(committed.info)
    }
}
