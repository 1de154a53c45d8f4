//! Keyed file cache
//!
//! `filestash-cache` maps serializable keys to immutable files on disk:
//! - atomic publication through staging files and renames
//! - single-flight population per key
//! - constant-time invalidation of everything through epochs
//! - absolute and sliding expiration enforced by the garbage collector
//! - readers that survive invalidation and collection of their entry
//!
//! ```no_run
//! use filestash_cache::{policy, CacheConfig, FileCache};
//! use tokio::io::AsyncReadExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = FileCache::<str>::new(CacheConfig::new("/tmp/filestash")).await?;
//! let cancel = CancellationToken::new();
//!
//! let mut reader = cache
//!     .get_or_add_stream(
//!         "report",
//!         |_key| async { Ok::<_, std::io::Error>(&b"expensive content"[..]) },
//!         &cancel,
//!         Some(policy::sliding(std::time::Duration::from_secs(600))),
//!     )
//!     .await?;
//!
//! let mut content = Vec::new();
//! reader.read_to_end(&mut content).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod epoch;
pub mod errors;
pub mod expiration;
pub mod keys;
pub mod streaming;

pub use catalog::EntryInfo;
pub use config::{CacheConfig, CacheConfigBuilder};
pub use core::{CacheStatistics, FileCache, GcFailure, GcReport};
pub use epoch::MAX_PATH_OVERHEAD;
pub use errors::{CacheError, Error, RecoveryHint, Result};
pub use expiration::{AbsoluteExpiration, ExpirationPolicy, SlidingExpiration};
pub use streaming::CacheReader;

/// Shorthand constructors for the built-in expiration policies
pub mod policy {
    pub use crate::expiration::policies::{absolute, absolute_after, sliding};
}

pub use tokio_util::sync::CancellationToken;
