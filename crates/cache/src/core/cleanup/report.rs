//! Garbage collection report

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// A failure the collector could not resolve by waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    /// Entries evicted because their policy expired
    pub expired_evicted: usize,
    /// Entries dropped because their committed file disappeared
    pub dangling_dropped: usize,
    /// Files in `objects/` with no catalog entry that were deleted
    pub orphans_deleted: usize,
    pub graveyard_deleted: usize,
    /// Abandoned staging files deleted
    pub staging_deleted: usize,
    pub epochs_removed: usize,
    /// Items still in use; retried on the next pass
    pub deferred: usize,
    /// Keys skipped because an operation held their lock
    pub busy_keys: usize,
    /// Idle key locks forgotten
    pub locks_pruned: usize,
    pub failures: Vec<GcFailure>,
    pub duration: Duration,
}

impl GcReport {
    /// Files and directories deleted by this pass
    pub fn deleted(&self) -> usize {
        self.orphans_deleted + self.graveyard_deleted + self.staging_deleted + self.epochs_removed
    }

    /// Entries removed from the catalog by this pass
    pub fn evicted(&self) -> usize {
        self.expired_evicted + self.dangling_dropped
    }

    /// Nothing to do and nothing went wrong
    pub fn is_clean(&self) -> bool {
        self.deleted() == 0 && self.evicted() == 0 && self.deferred == 0 && self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, path: PathBuf, error: impl std::fmt::Display) {
        self.failures.push(GcFailure {
            path,
            error: error.to_string(),
        });
    }
}
