//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: stage runner, fan-out supervisor, stewards, `Pipeline::shutdown`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the pipeline listener (feeds `AliveTracker` and `SubscriberSet`),
//!   plus any receiver obtained from [`Pipeline::events`](crate::Pipeline::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
