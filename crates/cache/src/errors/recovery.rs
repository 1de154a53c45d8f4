//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

static NO_HINT: RecoveryHint = RecoveryHint::Ignore;

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Io { recovery_hint, .. }
            | Self::Provider { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint,
            Self::Cancelled { .. } => &NO_HINT,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.recovery_hint(),
            RecoveryHint::Retry { .. } | RecoveryHint::RunGarbageCollection
        )
    }

    /// Check if this error reports a cancelled operation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Build a cancellation error for the named operation
    #[must_use]
    pub const fn cancelled(operation: &'static str) -> Self {
        Self::Cancelled { operation }
    }
}
