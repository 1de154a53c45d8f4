//! Operations that deliver entries into caller-owned files

use crate::errors::Result;
use crate::expiration::ExpirationPolicy;
use crate::streaming::copy_to_target;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use super::super::types::FileCache;
use super::BoxError;

impl<K> FileCache<K>
where
    K: Serialize + ?Sized,
{
    /// [`get_or_add_stream`](Self::get_or_add_stream), then copy the entry
    /// over `target`
    pub async fn get_or_add_into_file<'a, F, Fut, R, E>(
        &'a self,
        key: &'a K,
        provider: F,
        cancel: &CancellationToken,
        target: &Path,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<()>
    where
        F: FnOnce(&'a K) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        R: AsyncRead + Unpin,
        E: Into<BoxError>,
    {
        let mut reader = self.get_or_add_stream(key, provider, cancel, policy).await?;
        let copied = copy_to_target(&mut reader, target, cancel, self.inner.config.buffer_size).await;
        self.inner.track(copied).map(|_| ())
    }

    /// [`get_or_add_from_source_path`](Self::get_or_add_from_source_path),
    /// then copy the entry over `target`
    pub async fn get_or_add_file_into_file<'a, F, Fut, E>(
        &'a self,
        key: &'a K,
        provider: F,
        cancel: &CancellationToken,
        target: &Path,
        policy: Option<Box<dyn ExpirationPolicy>>,
    ) -> Result<()>
    where
        F: FnOnce(&'a K) -> Fut,
        Fut: Future<Output = std::result::Result<PathBuf, E>>,
        E: Into<BoxError>,
    {
        let mut reader = self
            .get_or_add_from_source_path(key, provider, cancel, policy)
            .await?;
        let copied = copy_to_target(&mut reader, target, cancel, self.inner.config.buffer_size).await;
        self.inner.track(copied).map(|_| ())
    }

    /// Copy the entry for `key` over `target` if one is published.
    ///
    /// Returns `false` on a miss, leaving `target` untouched.
    pub async fn try_get_into_file(
        &self,
        key: &K,
        cancel: &CancellationToken,
        target: &Path,
    ) -> Result<bool> {
        let mut reader = match self.try_get_stream(key, cancel).await? {
            Some(reader) => reader,
            None => return Ok(false),
        };
        let copied = copy_to_target(&mut reader, target, cancel, self.inner.config.buffer_size).await;
        self.inner.track(copied).map(|_| true)
    }
}
