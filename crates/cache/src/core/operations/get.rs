//! Read-through operations

use crate::errors::{CacheError, Result};
use crate::expiration::ExpirationPolicy;
use crate::keys::KeyStem;
use crate::streaming::{stage_from, CacheReader};
use filestash_utils::tracing::cache_span;
use serde::Serialize;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::super::types::FileCache;
use super::BoxError;
use super::utils::check_cancelled;

impl<K> FileCache<K>
where
    K: Serialize + ?Sized,
{
    /// Open the entry for `key` if one is published.
    ///
    /// Never evaluates expiration; an expired entry is served until the
    /// collector evicts it.
    pub async fn try_get_stream(
        &self,
        key: &K,
        cancel: &CancellationToken,
    ) -> Result<Option<CacheReader>> {
        let result = async {
            check_cancelled(cancel, "try_get")?;
            let stem = KeyStem::of(key)?;
            self.inner.open_entry(&stem, "try_get").await
        }
        .await;
        self.inner.track(result)
    }

    /// Open the entry for `key`, producing it with `provider` on a miss.
    ///
    /// Concurrent callers for the same key are serialized: the provider runs
    /// at most once per miss and everyone else reads its result.
    pub async fn get_or_add_stream<'a, F, Fut, R, E>(
        &'a self,
        key: &'a K,
        provider: F,
        cancel: &CancellationToken,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<CacheReader>
    where
        F: FnOnce(&'a K) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        R: AsyncRead + Unpin,
        E: Into<BoxError>,
    {
        let result = self
            .get_or_add_with(key, cancel, policy, move |stem| async move {
                match provider(key).await {
                    Ok(source) => Ok(source),
                    Err(e) => Err(CacheError::provider(stem.as_str(), e)),
                }
            })
            .await;
        self.inner.track(result)
    }

    /// Like [`get_or_add_stream`](Self::get_or_add_stream), with a provider
    /// that names an existing file whose content becomes the entry
    pub async fn get_or_add_from_source_path<'a, F, Fut, E>(
        &'a self,
        key: &'a K,
        provider: F,
        cancel: &CancellationToken,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<CacheReader>
    where
        F: FnOnce(&'a K) -> Fut,
        Fut: Future<Output = std::result::Result<PathBuf, E>>,
        E: Into<BoxError>,
    {
        let result = self
            .get_or_add_with(key, cancel, policy, move |stem| async move {
                let path = match provider(key).await {
                    Ok(path) => path,
                    Err(e) => return Err(CacheError::provider(stem.as_str(), e)),
                };
                open_source(path).await
            })
            .await;
        self.inner.track(result)
    }

    pub(super) async fn get_or_add_with<P, PFut, R>(
        &self,
        key: &K,
        cancel: &CancellationToken,
        policy: Option<Box<dyn ExpirationPolicy>>,
        produce: P,
    ) -> Result<CacheReader>
    where
        P: FnOnce(KeyStem) -> PFut,
        PFut: Future<Output = Result<R>>,
        R: AsyncRead + Unpin,
    {
        check_cancelled(cancel, "get_or_add")?;
        let stem = KeyStem::of(key)?;
        let span = cache_span("get_or_add", stem.as_str());

        async move {
            let inner = &self.inner;
            let _guard = inner.lock_key(&stem, cancel, "get_or_add").await?;

            if let Some(reader) = inner.open_entry(&stem, "get_or_add").await? {
                return Ok(reader);
            }

            inner.stats.record_provider_call();
            let produced = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                produced = produce(stem.clone()) => Some(produced),
            };
            let mut source = match produced {
                Some(source) => source?,
                None => return Err(CacheError::cancelled("get_or_add")),
            };

            let epoch = inner.epochs.current();
            let staged = stage_from(
                &epoch,
                &stem,
                &mut source,
                cancel,
                inner.config.buffer_size,
                inner.config.sync_on_commit,
            )
            .await?;
            drop(source);

            let committed = inner.commit(&epoch, &stem, staged, policy, cancel).await?;
            match CacheReader::open(committed.path.clone(), committed.info).await? {
                Some(reader) => Ok(reader),
                None => Err(CacheError::io(
                    committed.path,
                    "open committed file",
                    io::Error::from(io::ErrorKind::NotFound),
                )),
            }
        }
        .instrument(span)
        .await
    }
}

/// Open a caller-named source file for staging
pub(super) async fn open_source(path: PathBuf) -> Result<tokio::fs::File> {
    match tokio::fs::File::open(&path).await {
        Ok(file) => Ok(file),
        Err(e) => Err(CacheError::io(path, "open source file", e)),
    }
}
