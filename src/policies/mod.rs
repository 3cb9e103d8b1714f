//! Restart policies for stewards.
//!
//! This module groups the knobs that control **whether** a steward keeps replacing an
//! unhealthy ward and **how long** it waits in between.
//!
//! ## Contents
//! - [`StewardPolicy`] restart limit plus backoff, consumed by [`Steward`](crate::Steward)
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid restarting in lockstep
//!
//! ## Defaults
//! - `StewardPolicy::default()` → immediate restarts, no limit.
//! - `JitterPolicy::None`; consider `Equal` when many stewards share a dependency.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::StewardPolicy;
