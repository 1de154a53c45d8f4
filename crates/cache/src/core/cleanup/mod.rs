//! Garbage collection
//!
//! A pass runs four phases, each tolerant of files still held open:
//!
//! 1. evict expired entries and entries whose committed file is gone
//! 2. delete orphans in `objects/` and empty the graveyard
//! 3. delete staging files older than the configured grace period
//! 4. delete retired epoch directories nobody uses any more
//!
//! Anything still in use is deferred to a later pass. Cancellation is
//! checked between phases.

mod background;
mod report;

pub(crate) use background::start_collection_task;
pub use report::{GcFailure, GcReport};

use crate::errors::{CacheError, Result};
use crate::keys::KeyStem;
use filestash_utils::{is_in_use, remove_dir_all, remove_file, Removal};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::operations::{check_cancelled, Discard};
use super::types::{CacheInner, FileCache};

impl<K> FileCache<K>
where
    K: Serialize + ?Sized,
{
    /// Run one collection pass.
    ///
    /// Safe to run at any time alongside other operations. Cancellation
    /// stops the pass after the current phase and keeps what was done.
    pub async fn garbage_collect(&self, cancel: &CancellationToken) -> Result<GcReport> {
        let result = self.inner.collect(cancel).await;
        self.inner.track(result)
    }
}

impl CacheInner {
    pub(crate) async fn collect(&self, cancel: &CancellationToken) -> Result<GcReport> {
        check_cancelled(cancel, "garbage_collect")?;
        let _gate = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CacheError::cancelled("garbage_collect")),
            gate = self.gc_gate.lock() => gate,
        };

        let started = Instant::now();
        let mut report = GcReport::default();

        self.evict_entries(&mut report).await;
        checkpoint(cancel, &report)?;

        self.sweep_objects(&mut report).await;
        self.sweep_graveyard(&mut report).await;
        checkpoint(cancel, &report)?;

        self.sweep_staging(&mut report).await;
        checkpoint(cancel, &report)?;

        self.sweep_epochs(&mut report).await;
        report.locks_pruned = self.catalog.prune_locks();
        report.duration = started.elapsed();

        if report.deleted() + report.evicted() > 0 || !report.failures.is_empty() {
            info!(
                evicted = report.evicted(),
                deleted = report.deleted(),
                deferred = report.deferred,
                failures = report.failures.len(),
                duration_ms = report.duration.as_millis() as u64,
                "garbage collection finished"
            );
        } else {
            debug!(deferred = report.deferred, "garbage collection found nothing to do");
        }
        Ok(report)
    }

    /// Phase 1: expired and dangling catalog entries
    async fn evict_entries(&self, report: &mut GcReport) {
        let now = SystemTime::now();

        for stem in self.catalog.expired(now) {
            let _guard = match self.catalog.try_lock_key(&stem) {
                Some(guard) => guard,
                None => {
                    report.busy_keys += 1;
                    continue;
                }
            };
            // Re-checked under the lock: the entry may have been rewritten
            let path = match self.catalog.remove_expired(&stem, now) {
                Some(path) => path,
                None => continue,
            };
            report.expired_evicted += 1;
            self.stats.record_expired(1);
            debug!(stem = %stem, "evicted expired entry");

            let outcome = self.discard_committed(&path).await;
            note_discard(report, &path, outcome);
        }

        for (stem, path) in self.catalog.paths() {
            if !is_missing(&path).await {
                continue;
            }
            let _guard = match self.catalog.try_lock_key(&stem) {
                Some(guard) => guard,
                None => {
                    report.busy_keys += 1;
                    continue;
                }
            };
            if is_missing(&path).await && self.catalog.remove_if_path(&stem, &path) {
                report.dangling_dropped += 1;
                debug!(stem = %stem, path = %path.display(), "dropped entry without committed file");
            }
        }
    }

    /// Phase 2a: files in the current epoch's `objects/` nobody refers to
    async fn sweep_objects(&self, report: &mut GcReport) {
        let epoch = self.epochs.current();
        let files = match list_files(&epoch.objects_dir()).await {
            Ok(files) => files,
            Err((path, e)) => {
                report.fail(path, e);
                return;
            }
        };

        for (path, name) in files {
            let stem = match KeyStem::parse(&name) {
                Some(stem) => stem,
                None => {
                    // Not written by the cache
                    if note_removal(report, &path, remove_file(&path).await) {
                        report.orphans_deleted += 1;
                    }
                    continue;
                }
            };
            if self.catalog.contains(&stem) {
                continue;
            }

            let _guard = match self.catalog.try_lock_key(&stem) {
                Some(guard) => guard,
                None => {
                    report.busy_keys += 1;
                    continue;
                }
            };
            if self.catalog.contains(&stem) {
                continue;
            }

            let outcome = self.discard_committed(&path).await;
            if matches!(outcome, Discard::Removed | Discard::Buried(_)) {
                report.orphans_deleted += 1;
            }
            note_discard(report, &path, outcome);
        }
    }

    /// Phase 2b: files moved aside while they were still open
    async fn sweep_graveyard(&self, report: &mut GcReport) {
        let epoch = self.epochs.current();
        let files = match list_files(&epoch.graveyard_dir()).await {
            Ok(files) => files,
            Err((path, e)) => {
                report.fail(path, e);
                return;
            }
        };

        for (path, _) in files {
            if note_removal(report, &path, remove_file(&path).await) {
                report.graveyard_deleted += 1;
            }
        }
    }

    /// Phase 3: staging files abandoned by crashed or cancelled writers
    async fn sweep_staging(&self, report: &mut GcReport) {
        let epoch = self.epochs.current();
        let grace = self.config.staging_grace;
        let files = match list_files(&epoch.staging_dir()).await {
            Ok(files) => files,
            Err((path, e)) => {
                report.fail(path, e);
                return;
            }
        };

        let now = SystemTime::now();
        for (path, _) in files {
            let modified = match tokio::fs::symlink_metadata(&path).await {
                Ok(metadata) => metadata.modified(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };
            let age = match modified {
                Ok(modified) => now.duration_since(modified).unwrap_or(Duration::ZERO),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "staging file has no modification time");
                    continue;
                }
            };
            if age < grace {
                continue;
            }
            if note_removal(report, &path, remove_file(&path).await) {
                report.staging_deleted += 1;
            }
        }
    }

    /// Phase 4: retired epochs no in-flight operation references
    async fn sweep_epochs(&self, report: &mut GcReport) {
        if let Err(e) = self.epochs.discover_retired().await {
            report.fail(self.epochs.base_dir().to_path_buf(), e);
        }

        for epoch in self.epochs.unreferenced_retired() {
            let id = epoch.id();
            let root = epoch.root().to_path_buf();
            drop(epoch);
            if self.epochs.is_current(id) {
                continue;
            }

            if note_removal(report, &root, remove_dir_all(&root).await) {
                self.epochs.forget(id);
                report.epochs_removed += 1;
                debug!(epoch = %id, "removed retired epoch");
            }
        }
    }
}

fn checkpoint(cancel: &CancellationToken, report: &GcReport) -> Result<()> {
    if cancel.is_cancelled() {
        debug!(
            evicted = report.evicted(),
            deleted = report.deleted(),
            "garbage collection cancelled"
        );
        return Err(CacheError::cancelled("garbage_collect"));
    }
    Ok(())
}

async fn is_missing(path: &Path) -> bool {
    matches!(tokio::fs::try_exists(path).await, Ok(false))
}

/// Regular files directly inside `dir`. A missing directory is empty.
async fn list_files(dir: &Path) -> std::result::Result<Vec<(PathBuf, String)>, (PathBuf, io::Error)> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err((dir.to_path_buf(), e)),
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let is_dir = match entry.file_type().await {
                    Ok(file_type) => file_type.is_dir(),
                    Err(_) => continue,
                };
                if is_dir {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                files.push((entry.path(), name));
            }
            Ok(None) => break,
            Err(e) => return Err((dir.to_path_buf(), e)),
        }
    }
    Ok(files)
}

/// Account for a removal attempt; returns whether the path is gone
fn note_removal(report: &mut GcReport, path: &Path, outcome: Removal) -> bool {
    match outcome {
        Removal::Removed => true,
        Removal::InUse(e) => {
            defer(report, path, &e);
            false
        }
        Removal::Failed(e) => {
            surface(report, path, e);
            false
        }
    }
}

fn note_discard(report: &mut GcReport, path: &Path, outcome: Discard) {
    match outcome {
        Discard::Removed | Discard::Buried(_) => {}
        Discard::Deferred(e) => defer(report, path, &e),
        Discard::Failed(e) if is_in_use(&e) => defer(report, path, &e),
        Discard::Failed(e) => surface(report, path, e),
    }
}

fn defer(report: &mut GcReport, path: &Path, error: &io::Error) {
    report.deferred += 1;
    debug!(path = %path.display(), error = %error, "in use; deferred to a later pass");
}

fn surface(report: &mut GcReport, path: &Path, error: io::Error) {
    warn!(path = %path.display(), error = %error, "garbage collection could not delete");
    report.fail(path.to_path_buf(), error);
}
