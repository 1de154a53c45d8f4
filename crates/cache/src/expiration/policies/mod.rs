//! Built-in expiration policies

mod absolute;
mod sliding;

pub use absolute::AbsoluteExpiration;
pub use sliding::SlidingExpiration;

use super::traits::ExpirationPolicy;
use std::time::{Duration, SystemTime};

/// Expire at a fixed point in time
pub fn absolute(deadline: SystemTime) -> Box<dyn ExpirationPolicy> {
    Box::new(AbsoluteExpiration::new(deadline))
}

/// Expire `ttl` from now
pub fn absolute_after(ttl: Duration) -> Box<dyn ExpirationPolicy> {
    Box::new(AbsoluteExpiration::after(ttl))
}

/// Expire once no access happened for `window`
pub fn sliding(window: Duration) -> Box<dyn ExpirationPolicy> {
    Box::new(SlidingExpiration::new(window))
}
