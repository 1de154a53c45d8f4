//! Background collection task

use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::types::CacheInner;

/// Start periodic collection when `gc_interval` is configured.
///
/// The task only holds a weak reference and stops once the cache is dropped.
pub(crate) fn start_collection_task(inner: &Arc<CacheInner>) {
    let interval = match inner.config.gc_interval {
        Some(interval) if !interval.is_zero() => interval,
        _ => return,
    };
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            warn!("no Tokio runtime available; background garbage collection disabled");
            return;
        }
    };

    let weak = Arc::downgrade(inner);
    let handle = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let inner = match weak.upgrade() {
                Some(inner) => inner,
                None => break,
            };
            match inner.collect(&CancellationToken::new()).await {
                Ok(report) => {
                    debug!(
                        evicted = report.evicted(),
                        deleted = report.deleted(),
                        "background garbage collection pass"
                    );
                }
                Err(e) => {
                    inner.stats.record_error();
                    warn!(error = %e, "background garbage collection failed");
                }
            }
        }
    });

    *inner.cleanup_handle.write() = Some(handle);
}
