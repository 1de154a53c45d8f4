//! Expiration policy trait

use std::any::Any;
use std::fmt::Debug;
use std::time::SystemTime;

/// Decides when a cache entry may be evicted.
///
/// Implementations are stored behind `Box<dyn ExpirationPolicy>` in the
/// catalog. `log_access` and `try_merge` are only ever called while the
/// catalog holds its write lock, so they never race with `is_expired`.
pub trait ExpirationPolicy: Send + Sync + Debug + 'static {
    /// Whether the entry is expired at `now`
    fn is_expired(&self, now: SystemTime) -> bool;

    /// Record that the entry was read or (re)written at `now`
    fn log_access(&mut self, now: SystemTime);

    /// Fold the policy of an entry being replaced into `self`.
    ///
    /// Returns `false` when the two policies cannot be combined; the caller
    /// then keeps `self` unchanged.
    fn try_merge(&mut self, other: &dyn ExpirationPolicy) -> bool;

    /// Downcasting support for `try_merge`
    fn as_any(&self) -> &dyn Any;
}
