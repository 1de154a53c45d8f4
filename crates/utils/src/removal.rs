//! Best-effort removal of files and directories
//!
//! Cache sweeps must never abort because a reader still holds a file open.
//! Every helper here folds "already gone" into success and separates
//! "in use" from genuine failures so callers can defer the former.

use std::io;
use std::path::Path;

/// Outcome of a best-effort removal
#[derive(Debug)]
pub enum Removal {
    /// The path no longer exists (removed now, or already absent)
    Removed,
    /// The path is held open elsewhere; retry on a later pass
    InUse(io::Error),
    /// Any other failure
    Failed(io::Error),
}

impl Removal {
    fn from_result(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => Removal::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Removal::Removed,
            Err(e) if is_in_use(&e) => Removal::InUse(e),
            Err(e) => Removal::Failed(e),
        }
    }

    /// Whether the path is gone
    #[inline]
    pub fn is_removed(&self) -> bool {
        matches!(self, Removal::Removed)
    }

    /// The underlying error, if the removal did not happen
    pub fn error(&self) -> Option<&io::Error> {
        match self {
            Removal::Removed => None,
            Removal::InUse(e) | Removal::Failed(e) => Some(e),
        }
    }
}

/// Check whether an I/O error means "another handle holds this file"
pub fn is_in_use(err: &io::Error) -> bool {
    #[cfg(windows)]
    {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }

    #[cfg(unix)]
    {
        matches!(err.raw_os_error(), Some(code) if code == libc::EBUSY || code == libc::ETXTBSY)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = err;
        false
    }
}

/// Remove a file, tolerating absence and classifying in-use failures
pub async fn remove_file(path: &Path) -> Removal {
    Removal::from_result(tokio::fs::remove_file(path).await)
}

/// Remove a directory tree, tolerating absence and classifying in-use failures
pub async fn remove_dir_all(path: &Path) -> Removal {
    Removal::from_result(tokio::fs::remove_dir_all(path).await)
}

/// Blocking variant of [`remove_file`] for use in `Drop` implementations
pub fn remove_file_blocking(path: &Path) -> Removal {
    Removal::from_result(std::fs::remove_file(path))
}
