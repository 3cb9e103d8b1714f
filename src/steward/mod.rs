//! Self-healing supervision: [`Steward`] restarts a [`Ward`] whose heartbeat goes quiet.
//!
//! - [`ward`]: the [`Ward`] trait and the closure-backed [`WardFn`];
//! - [`steward`]: the monitoring loop and [`Pipeline::supervise`](crate::Pipeline::supervise).

mod steward;
mod ward;

pub use steward::Steward;
pub use ward::{Ward, WardFn, WardRef};
