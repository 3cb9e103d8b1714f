//! # Restart policy for stewards.
//!
//! [`StewardPolicy`] answers the two questions the bare steward pattern leaves open:
//! how long to wait before starting a replacement ward, and when to give up.
//!
//! ```text
//! ward unhealthy / exited
//!   ├─► restarts += 1
//!   ├─► max_restarts = Some(n) and restarts > n ─► WardExhausted, steward stops
//!   └─► delay = backoff.next(restarts - 1) ─► sleep (cancellable) ─► start ward
//!
//! ward pulses ─► restarts = 0
//! ```
//!
//! The counter only tracks *consecutive* restarts: any pulse from a ward proves the
//! replacement came up healthy and resets the streak.

use crate::policies::BackoffPolicy;

/// Restart behavior of a [`Steward`](crate::Steward).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StewardPolicy {
    /// Delay between detecting an unhealthy ward and starting its replacement.
    pub backoff: BackoffPolicy,
    /// Maximum consecutive restarts before the steward gives up (`None` = unlimited).
    pub max_restarts: Option<u32>,
}

impl StewardPolicy {
    /// Restart immediately, forever.
    pub const fn unlimited() -> Self {
        Self {
            backoff: BackoffPolicy::immediate(),
            max_restarts: None,
        }
    }

    /// Returns a policy with the given backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a policy that gives up after `n` consecutive restarts.
    pub fn with_max_restarts(mut self, n: u32) -> Self {
        self.max_restarts = Some(n);
        self
    }

    /// Returns `true` if a streak of `restarts` consecutive restarts is still allowed.
    #[inline]
    pub fn allows(&self, restarts: u32) -> bool {
        self.max_restarts.is_none_or(|max| restarts <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_allows_everything() {
        let policy = StewardPolicy::unlimited();
        assert!(policy.allows(0));
        assert!(policy.allows(u32::MAX));
    }

    #[test]
    fn max_restarts_is_inclusive() {
        let policy = StewardPolicy::default().with_max_restarts(3);
        assert!(policy.allows(3));
        assert!(!policy.allows(4));
    }
}
