//! # Wards: restartable units watched by a [`Steward`](crate::Steward).
//!
//! A ward is anything that can be (re)started on demand and reports liveness through a
//! [`Heartbeat`]. The steward calls [`Ward::start`] once per incarnation, each time with
//! a fresh [`Pipeline`] handle bound to that incarnation's token.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pipevisor::{HeartbeatMode, WardFn, WardRef};
//!
//! let ward: WardRef = WardFn::arc(|pipeline, pulse| {
//!     let (heartbeat, _out) = pipeline.with_heartbeat::<(), _, _>(
//!         "worker",
//!         HeartbeatMode::Interval(pulse),
//!         |mut beat| async move {
//!             loop {
//!                 beat.sleep(Duration::from_millis(10)).await?;
//!             }
//!         },
//!     );
//!     heartbeat
//! });
//! # let _ = ward;
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::core::Pipeline;
use crate::sequence::Heartbeat;

/// Shared handle to a ward.
pub type WardRef = Arc<dyn Ward>;

/// A restartable unit of work that reports liveness.
pub trait Ward: Send + Sync + 'static {
    /// Starts one incarnation of the ward.
    ///
    /// `pipeline.token()` is the incarnation's token: the ward must stop when it fires.
    /// The ward should pulse at least every `pulse_interval`.
    fn start(&self, pipeline: Pipeline, pulse_interval: Duration) -> Heartbeat;
}

/// Function-backed ward.
///
/// Wraps a closure that starts a new incarnation per call; state shared between
/// incarnations must be captured explicitly (e.g. behind an `Arc`).
#[derive(Debug)]
pub struct WardFn<F> {
    f: F,
}

impl<F> WardFn<F>
where
    F: Fn(Pipeline, Duration) -> Heartbeat + Send + Sync + 'static,
{
    /// Creates a new function-backed ward.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the ward and returns it as a shared handle.
    pub fn arc(f: F) -> WardRef {
        Arc::new(Self::new(f))
    }
}

impl<F> Ward for WardFn<F>
where
    F: Fn(Pipeline, Duration) -> Heartbeat + Send + Sync + 'static,
{
    fn start(&self, pipeline: Pipeline, pulse_interval: Duration) -> Heartbeat {
        (self.f)(pipeline, pulse_interval)
    }
}

impl Ward for WardRef {
    fn start(&self, pipeline: Pipeline, pulse_interval: Duration) -> Heartbeat {
        self.as_ref().start(pipeline, pulse_interval)
    }
}
