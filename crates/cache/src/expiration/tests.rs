//! Tests for expiration policies

use super::*;
use proptest::prelude::*;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Later than any wall clock the tests run under, so explicit accesses win
// over the access recorded at construction.
const FUTURE: u64 = 4_000_000_000;

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[derive(Debug)]
struct NeverExpires;

impl ExpirationPolicy for NeverExpires {
    fn is_expired(&self, _now: SystemTime) -> bool {
        false
    }

    fn log_access(&mut self, _now: SystemTime) {}

    fn try_merge(&mut self, _other: &dyn ExpirationPolicy) -> bool {
        false
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[test]
fn test_absolute_deadline() {
    let policy = AbsoluteExpiration::new(at(100));

    assert!(!policy.is_expired(at(99)));
    assert!(policy.is_expired(at(100)));
    assert!(policy.is_expired(at(101)));
}

#[test]
fn test_absolute_ignores_access() {
    let mut policy = AbsoluteExpiration::new(at(100));
    policy.log_access(at(500));

    assert_eq!(policy.deadline(), at(100));
    assert!(policy.is_expired(at(200)));
}

#[test]
fn test_absolute_in_the_past_is_expired() {
    let policy = absolute(SystemTime::now() - Duration::from_secs(60));
    assert!(policy.is_expired(SystemTime::now()));
}

#[test]
fn test_absolute_after_is_in_the_future() {
    let policy = AbsoluteExpiration::after(Duration::from_secs(3600));
    assert!(!policy.is_expired(SystemTime::now()));
}

#[test]
fn test_absolute_merge_keeps_later_deadline() {
    let mut newer = AbsoluteExpiration::new(at(100));
    let older = AbsoluteExpiration::new(at(300));

    assert!(newer.try_merge(&older));
    assert_eq!(newer.deadline(), at(300));

    let mut later = AbsoluteExpiration::new(at(400));
    assert!(later.try_merge(&older));
    assert_eq!(later.deadline(), at(400));
}

#[test]
fn test_sliding_window() {
    let mut policy = SlidingExpiration::new(Duration::from_secs(10));
    policy.log_access(at(FUTURE));

    assert!(!policy.is_expired(at(FUTURE + 9)));
    assert!(policy.is_expired(at(FUTURE + 10)));

    policy.log_access(at(FUTURE + 9));
    assert!(!policy.is_expired(at(FUTURE + 18)));
    assert!(policy.is_expired(at(FUTURE + 19)));
}

#[test]
fn test_sliding_access_never_moves_backwards() {
    let mut policy = SlidingExpiration::new(Duration::from_secs(10));
    policy.log_access(at(FUTURE + 2));
    policy.log_access(at(FUTURE + 1));

    assert_eq!(policy.last_access(), at(FUTURE + 2));
}

#[test]
fn test_sliding_clock_skew_is_not_expired() {
    let mut policy = SlidingExpiration::new(Duration::from_secs(10));
    policy.log_access(at(FUTURE + 2));

    assert!(!policy.is_expired(at(FUTURE + 1)));
}

#[test]
fn test_sliding_merge_keeps_longer_window_and_latest_access() {
    let mut newer = SlidingExpiration::new(Duration::from_secs(5));
    newer.log_access(at(FUTURE));
    let mut older = SlidingExpiration::new(Duration::from_secs(60));
    older.log_access(at(FUTURE + 100));

    assert!(newer.try_merge(&older));
    assert_eq!(newer.window(), Duration::from_secs(60));
    assert_eq!(newer.last_access(), at(FUTURE + 100));
}

#[test]
fn test_mixed_policies_do_not_merge() {
    let mut absolute = AbsoluteExpiration::new(at(100));
    let sliding = SlidingExpiration::new(Duration::from_secs(5));

    assert!(!absolute.try_merge(&sliding));
    assert_eq!(absolute.deadline(), at(100));

    let mut sliding = SlidingExpiration::new(Duration::from_secs(5));
    assert!(!sliding.try_merge(&AbsoluteExpiration::new(at(100))));
    assert_eq!(sliding.window(), Duration::from_secs(5));
}

#[test]
fn test_custom_policy_never_merges_with_builtin() {
    let mut boxed = sliding(Duration::from_secs(1));
    assert!(!boxed.try_merge(&NeverExpires));

    let mut custom = NeverExpires;
    assert!(!custom.try_merge(boxed.as_ref()));
    assert!(!custom.is_expired(at(u32::MAX as u64)));
}

proptest! {
    #[test]
    fn prop_absolute_merge_is_max(a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let mut left = AbsoluteExpiration::new(at(a));
        let right = AbsoluteExpiration::new(at(b));
        prop_assert!(left.try_merge(&right));
        prop_assert_eq!(left.deadline(), at(a.max(b)));
    }

    #[test]
    fn prop_sliding_expiry_matches_idle_time(window in 1u64..10_000, idle in 0u64..20_000) {
        let mut policy = SlidingExpiration::new(Duration::from_secs(window));
        policy.log_access(at(FUTURE));
        prop_assert_eq!(
            policy.is_expired(at(FUTURE + idle)),
            idle >= window
        );
    }
}
