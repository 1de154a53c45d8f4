//! Invalidation of every entry

use crate::errors::Result;
use filestash_utils::remove_dir_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::super::super::types::FileCache;
use super::super::utils::check_cancelled;

impl<K> FileCache<K>
where
    K: Serialize + ?Sized,
{
    /// Drop every entry by switching to a fresh epoch.
    ///
    /// Constant time in the number of entries: the previous epoch directory
    /// is deleted later by the collector, once no reader or writer uses it.
    pub async fn invalidate_all(&self, cancel: &CancellationToken) -> Result<()> {
        let result = async {
            check_cancelled(cancel, "invalidate_all")?;
            let inner = &self.inner;
            let next = inner.epochs.prepare().await?;

            if cancel.is_cancelled() {
                let abandoned = next.root();
                if let Some(e) = remove_dir_all(&abandoned).await.error() {
                    debug!(path = %abandoned.display(), error = %e, "could not remove unused epoch");
                }
                return check_cancelled(cancel, "invalidate_all");
            }

            let previous = inner.epochs.current_id();
            let dropped = inner.catalog.reset(|| inner.epochs.install(next));
            info!(
                previous = %previous,
                current = %inner.catalog.epoch(),
                dropped,
                "invalidated all entries"
            );
            Ok(())
        }
        .await;
        self.inner.track(result)
    }
}
