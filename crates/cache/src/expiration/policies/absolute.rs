//! Fixed-deadline expiration

use crate::expiration::traits::ExpirationPolicy;
use std::any::Any;
use std::time::{Duration, SystemTime};

/// Entry expires once the clock reaches `deadline`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteExpiration {
    deadline: SystemTime,
}

impl AbsoluteExpiration {
    pub fn new(deadline: SystemTime) -> Self {
        Self { deadline }
    }

    /// Deadline `ttl` from now, saturating at the far future
    pub fn after(ttl: Duration) -> Self {
        let now = SystemTime::now();
        let deadline = match now.checked_add(ttl) {
            Some(deadline) => deadline,
            None => now + Duration::from_secs(u32::MAX as u64),
        };
        Self { deadline }
    }

    pub fn deadline(&self) -> SystemTime {
        self.deadline
    }
}

impl ExpirationPolicy for AbsoluteExpiration {
    fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.deadline
    }

    fn log_access(&mut self, _now: SystemTime) {}

    fn try_merge(&mut self, other: &dyn ExpirationPolicy) -> bool {
        match other.as_any().downcast_ref::<AbsoluteExpiration>() {
            Some(other) => {
                // Later deadline wins
                self.deadline = self.deadline.max(other.deadline);
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
