//! # Backoff between consecutive ward restarts.
//!
//! [`BackoffPolicy`] decides how long a [`Steward`](crate::Steward) waits before it
//! starts a fresh ward after the previous one was found unhealthy. The delay for the
//! `n`-th consecutive restart (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jittered. The base delay is derived from the restart number only, so jitter
//! output never feeds back into later delays.
//!
//! The default is [`BackoffPolicy::immediate`]: restart at once, which is what the
//! plain steward pattern does.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use pipevisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart in a streak.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied on top of the base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Same as [`BackoffPolicy::immediate`].
    fn default() -> Self {
        Self::immediate()
    }
}

impl BackoffPolicy {
    /// Restart without any delay.
    pub const fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Exponential growth from `first` up to `max` with factor 2 and equal jitter.
    pub const fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }

    /// Returns `true` if every delay produced by this policy is zero.
    pub fn is_immediate(&self) -> bool {
        self.first.is_zero() || self.max.is_zero()
    }

    /// Computes the delay before the `restart`-th consecutive restart (0-indexed).
    pub fn next(&self, restart: u32) -> Duration {
        if self.is_immediate() {
            return Duration::ZERO;
        }
        let max_secs = self.max.as_secs_f64();
        let exp = restart.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling(first_ms: u64, max_ms: u64, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn default_restarts_immediately() {
        let policy = BackoffPolicy::default();
        assert!(policy.is_immediate());
        for restart in [0, 1, 7, u32::MAX] {
            assert_eq!(policy.next(restart), Duration::ZERO);
        }
    }

    #[test]
    fn doubles_until_cap() {
        let policy = doubling(100, 1_000, JitterPolicy::None);
        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(3), Duration::from_millis(800));
        assert_eq!(policy.next(4), Duration::from_millis(1_000));
        assert_eq!(policy.next(u32::MAX), Duration::from_millis(1_000));
    }

    #[test]
    fn first_above_max_is_clamped() {
        let policy = doubling(5_000, 1_000, JitterPolicy::None);
        assert_eq!(policy.next(0), Duration::from_millis(1_000));
    }

    #[test]
    fn equal_jitter_stays_in_upper_half() {
        let policy = doubling(1_000, 30_000, JitterPolicy::Equal);
        for restart in 0..5 {
            let base = Duration::from_millis(1_000 * 2u64.pow(restart));
            let delay = policy.next(restart);
            assert!(delay >= base / 2, "restart {restart}: {delay:?} < half of {base:?}");
            assert!(delay <= base, "restart {restart}: {delay:?} > {base:?}");
        }
    }

    #[test]
    fn decorrelated_jitter_respects_floor_and_cap() {
        let policy = doubling(100, 5_000, JitterPolicy::Decorrelated);
        for _ in 0..100 {
            let delay = policy.next(6);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(5_000));
        }
    }
}
