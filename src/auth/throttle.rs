use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

/// Consecutive failed logins tolerated from one address before it is blocked.
pub const LOGIN_ATTEMPT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoginAttempts {
    pub tries: u32,
    pub blocked: bool,
}

#[derive(Debug, Default)]
struct AttemptRecord {
    tries: u32,
    blocked_at: Option<Instant>,
}

impl AttemptRecord {
    fn snapshot(&self) -> LoginAttempts {
        LoginAttempts {
            tries: self.tries,
            blocked: self.blocked_at.is_some(),
        }
    }
}

/// Failed-login bookkeeping keyed by client address.
///
/// Each mutation runs under the map shard lock for its key, so concurrent
/// failures from one address are never lost. A missing record is the clean
/// state: zero tries, not blocked.
#[derive(Debug, Default)]
pub struct LoginThrottle {
    attempts: DashMap<String, AttemptRecord>,
    lockout: Option<Duration>,
}

impl LoginThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks expire after `lockout` instead of lasting until `clear`.
    pub fn with_lockout(lockout: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            lockout: Some(lockout),
        }
    }

    /// Count one more failure for `address`. Returns the new count.
    pub fn record_failure(&self, address: &str) -> u32 {
        let mut entry = self.attempts.entry(address.to_string()).or_default();
        entry.tries += 1;
        tracing::debug!("Failed login from {address}: {} tries", entry.tries);
        entry.tries
    }

    pub fn is_blocked(&self, address: &str) -> bool {
        let expired = match self.attempts.get(address) {
            None => return false,
            Some(entry) => match entry.blocked_at {
                None => return false,
                Some(at) => self.lockout.is_some_and(|lockout| at.elapsed() >= lockout),
            },
        };

        if expired {
            // Only drop the record if nobody re-blocked it in between.
            self.attempts.remove_if(address, |_, record| {
                record
                    .blocked_at
                    .zip(self.lockout)
                    .is_some_and(|(at, lockout)| at.elapsed() >= lockout)
            });
            tracing::info!("Login lockout for {address} expired");
            return false;
        }

        true
    }

    /// Mark `address` blocked once it has reached the threshold. Returns whether it is blocked.
    pub fn block_if_threshold_reached(&self, address: &str) -> bool {
        let Some(mut entry) = self.attempts.get_mut(address) else {
            return false;
        };

        if entry.tries >= LOGIN_ATTEMPT_THRESHOLD && entry.blocked_at.is_none() {
            entry.blocked_at = Some(Instant::now());
            tracing::warn!("Blocking login from {address} after {} failed attempts", entry.tries);
        }

        entry.blocked_at.is_some()
    }

    /// Forget everything about `address`, returning it to the clean state.
    pub fn clear(&self, address: &str) {
        if self.attempts.remove(address).is_some() {
            tracing::debug!("Cleared login attempts for {address}");
        }
    }

    pub fn attempts(&self, address: &str) -> LoginAttempts {
        self.attempts
            .get(address)
            .map(|entry| entry.snapshot())
            .unwrap_or_default()
    }
}
