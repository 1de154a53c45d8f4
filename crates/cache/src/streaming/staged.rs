//! Ownership guard for temporary files

use filestash_utils::{remove_file, remove_file_blocking, Removal};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A temporary file that is removed when dropped unless it was persisted.
///
/// Covers futures that are dropped mid-write as well as explicit failures.
#[derive(Debug)]
pub(crate) struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; leave it alone
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Remove the file now, without blocking the runtime
    pub async fn discard(mut self) {
        self.armed = false;
        log_leftover(&self.path, remove_file(&self.path).await);
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            log_leftover(&self.path, remove_file_blocking(&self.path));
        }
    }
}

fn log_leftover(path: &Path, outcome: Removal) {
    if let Some(e) = outcome.error() {
        // The garbage collector sweeps stale staging files
        debug!(path = %path.display(), error = %e, "left temporary file behind");
    }
}
