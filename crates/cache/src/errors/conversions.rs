//! Error conversion utilities

use super::types::{CacheError, RecoveryHint, SerializationOp};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pick a recovery hint from the kind of an I/O error
pub(crate) fn hint_for_io(error: &std::io::Error, path: &Path) -> RecoveryHint {
    use std::io::ErrorKind;

    if filestash_utils::is_in_use(error) {
        return RecoveryHint::Retry {
            after: Duration::from_millis(100),
        };
    }

    match error.kind() {
        ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
            path: path.to_path_buf(),
        },
        ErrorKind::NotFound => RecoveryHint::RunGarbageCollection,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            RecoveryHint::Retry {
                after: Duration::from_millis(100),
            }
        }
        _ => classify_os_error(error, path),
    }
}

#[cfg(unix)]
fn classify_os_error(error: &std::io::Error, path: &Path) -> RecoveryHint {
    match error.raw_os_error() {
        Some(code) if code == libc::ENOSPC || code == libc::EDQUOT => RecoveryHint::CheckDiskSpace,
        Some(code) if code == libc::ENAMETOOLONG => RecoveryHint::ShortenBasePath {
            overhead: crate::epoch::MAX_PATH_OVERHEAD,
        },
        _ => manual(path),
    }
}

#[cfg(windows)]
fn classify_os_error(error: &std::io::Error, path: &Path) -> RecoveryHint {
    // ERROR_DISK_FULL, ERROR_HANDLE_DISK_FULL, ERROR_FILENAME_EXCED_RANGE
    match error.raw_os_error() {
        Some(112) | Some(39) => RecoveryHint::CheckDiskSpace,
        Some(206) => RecoveryHint::ShortenBasePath {
            overhead: crate::epoch::MAX_PATH_OVERHEAD,
        },
        _ => manual(path),
    }
}

#[cfg(not(any(unix, windows)))]
fn classify_os_error(_error: &std::io::Error, path: &Path) -> RecoveryHint {
    manual(path)
}

fn manual(path: &Path) -> RecoveryHint {
    RecoveryHint::Manual {
        instructions: format!("Inspect '{}'", path.display()),
    }
}

impl CacheError {
    /// Wrap an I/O error with the path and operation it happened on
    pub(crate) fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        let recovery_hint = hint_for_io(&source, &path);
        Self::Io {
            path,
            operation,
            source,
            recovery_hint,
        }
    }

    /// Wrap a failure returned by a content provider
    pub(crate) fn provider<E>(key: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Provider {
            key: key.to_string(),
            source: source.into(),
            recovery_hint: RecoveryHint::Retry {
                after: Duration::from_millis(100),
            },
        }
    }
}

/// Convert bincode errors raised while encoding keys
impl From<bincode::Error> for CacheError {
    fn from(error: bincode::Error) -> Self {
        Self::Serialization {
            operation: SerializationOp::EncodeKey,
            source: Box::new(error),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Check that the key type serializes deterministically".to_string(),
            },
        }
    }
}

/// Surface cache errors through `std::io` interfaces
impl From<CacheError> for std::io::Error {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Io { source, .. } => source,
            cancelled @ CacheError::Cancelled { .. } => {
                std::io::Error::new(std::io::ErrorKind::Interrupted, cancelled)
            }
            other => std::io::Error::other(other),
        }
    }
}
