//! # Global pipeline configuration.
//!
//! Provides [`Config`]: centralized settings for a [`Pipeline`](crate::Pipeline).
//!
//! ## Sentinel values
//! - `workers = 0` → one fan-out worker per available CPU
//! - `sequence_capacity = 0` and `bus_capacity = 0` are clamped to 1

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::policies::StewardPolicy;

/// Global configuration for a pipeline.
///
/// ## Field semantics
/// - `grace`: how long [`Pipeline::shutdown`](crate::Pipeline::shutdown) waits for workers
/// - `bus_capacity`: event bus ring buffer size
/// - `sequence_capacity`: default buffer size of every stage output sequence
/// - `workers`: default fan-out width (`0` = available parallelism)
/// - `steward`: default restart policy for stewards
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for workers to stop after cancellation.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers that lag further behind observe `Lagged` and skip older events.
    pub bus_capacity: usize,

    /// Default buffer capacity of stage output sequences.
    ///
    /// A producer suspends once this many items wait unread.
    pub sequence_capacity: usize,

    /// Default number of fan-out workers (`0` = available parallelism).
    pub workers: usize,

    /// Default restart behavior of stewards.
    pub steward: StewardPolicy,
}

impl Config {
    /// Returns the fan-out width to use when the caller passes `0`.
    #[inline]
    pub fn workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.workers
        }
    }

    /// Returns the sequence capacity clamped to a minimum of 1.
    #[inline]
    pub fn sequence_capacity_clamped(&self) -> usize {
        self.sequence_capacity.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Recommended observer timeout for a heartbeat pulsing every `pulse_interval`.
    ///
    /// Twice the interval, so a single late tick is not mistaken for a stuck worker.
    #[inline]
    pub fn heartbeat_timeout(pulse_interval: Duration) -> Duration {
        pulse_interval.saturating_mul(2)
    }
}

impl Default for Config {
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `sequence_capacity = 16`
    /// - `workers = 0` (available parallelism)
    /// - `steward = StewardPolicy::default()` (immediate, unlimited restarts)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            sequence_capacity: 16,
            workers: 0,
            steward: StewardPolicy::default(),
        }
    }
}
