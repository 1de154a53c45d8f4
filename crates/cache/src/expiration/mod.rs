//! Expiration policies for cache entries
//!
//! A policy is attached to an entry when it is written and is consulted only
//! by the garbage collector. Reads record accesses but never evict.

pub mod policies;
pub mod traits;

#[cfg(test)]
mod tests;

pub use policies::{absolute, absolute_after, sliding, AbsoluteExpiration, SlidingExpiration};
pub use traits::ExpirationPolicy;
