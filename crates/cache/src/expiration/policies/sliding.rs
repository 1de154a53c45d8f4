//! Sliding-window expiration

use crate::expiration::traits::ExpirationPolicy;
use std::any::Any;
use std::time::{Duration, SystemTime};

/// Entry expires once it has not been accessed for `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingExpiration {
    window: Duration,
    last_access: SystemTime,
}

impl SlidingExpiration {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_access: SystemTime::now(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn last_access(&self) -> SystemTime {
        self.last_access
    }
}

impl ExpirationPolicy for SlidingExpiration {
    fn is_expired(&self, now: SystemTime) -> bool {
        match now.duration_since(self.last_access) {
            Ok(idle) => idle >= self.window,
            // Clock went backwards relative to the last access
            Err(_) => false,
        }
    }

    fn log_access(&mut self, now: SystemTime) {
        if now > self.last_access {
            self.last_access = now;
        }
    }

    fn try_merge(&mut self, other: &dyn ExpirationPolicy) -> bool {
        match other.as_any().downcast_ref::<SlidingExpiration>() {
            Some(other) => {
                self.window = self.window.max(other.window);
                self.last_access = self.last_access.max(other.last_access);
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
