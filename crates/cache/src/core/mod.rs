//! File cache facade
//!
//! [`FileCache`] ties together the catalog, the epoch store, the staging
//! writer and the garbage collector. Every operation takes a
//! [`CancellationToken`](tokio_util::sync::CancellationToken).

mod builder;
mod cleanup;
mod internal;
mod operations;
mod types;

#[cfg(test)]
mod tests;

pub use cleanup::{GcFailure, GcReport};
pub use internal::CacheStatistics;
pub use types::FileCache;
