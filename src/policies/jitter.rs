//! # Jitter for restart delays.
//!
//! When many stewards lose their wards at the same moment (a shared dependency went
//! away), restarting all of them in lockstep hammers the dependency again. [`JitterPolicy`]
//! spreads those restarts out.
//!
//! - [`JitterPolicy::None`]: exact delay
//! - [`JitterPolicy::Full`]: random in `[0, delay]`
//! - [`JitterPolicy::Equal`]: `delay/2 + random[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`]: random in `[base, prev * 3]`, capped at max

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for restart delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the computed delay as is.
    #[default]
    None,
    /// Random delay in `[0, delay]`.
    Full,
    /// `delay/2 + random[0, delay/2]`.
    Equal,
    /// Random delay in `[base, prev * 3]`, capped at `max`.
    ///
    /// Needs extra context; see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay`.
    ///
    /// `Decorrelated` returns the input unchanged here.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => Self::between(0, delay.as_millis() as u64),
            JitterPolicy::Equal => {
                let ms = delay.as_millis() as u64;
                let half = ms / 2;
                Self::between(half, ms)
            }
        }
    }

    /// Applies decorrelated jitter given the floor, the previous delay and the cap.
    ///
    /// Falls back to [`apply`](Self::apply) on `prev` for the other variants.
    pub fn apply_decorrelated(&self, base: Duration, prev: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(prev);
        }
        let base_ms = base.as_millis() as u64;
        let upper = (prev.as_millis() as u64)
            .saturating_mul(3)
            .min(max.as_millis() as u64)
            .max(base_ms);

        if base_ms >= upper {
            return base;
        }
        Self::between(base_ms, upper)
    }

    fn between(lo_ms: u64, hi_ms: u64) -> Duration {
        if hi_ms <= lo_ms {
            return Duration::from_millis(lo_ms);
        }
        Duration::from_millis(rand::rng().random_range(lo_ms..=hi_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_stays_zero() {
        for jitter in [JitterPolicy::None, JitterPolicy::Full, JitterPolicy::Equal] {
            assert_eq!(jitter.apply(Duration::ZERO), Duration::ZERO);
        }
    }

    #[test]
    fn full_jitter_never_exceeds_delay() {
        for _ in 0..200 {
            assert!(JitterPolicy::Full.apply(Duration::from_millis(50)) <= Duration::from_millis(50));
        }
    }

    #[test]
    fn decorrelated_falls_back_for_other_variants() {
        let d = JitterPolicy::None.apply_decorrelated(
            Duration::from_millis(1),
            Duration::from_millis(40),
            Duration::from_secs(1),
        );
        assert_eq!(d, Duration::from_millis(40));
    }
}
