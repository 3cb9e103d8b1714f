//! # Event subscribers.
//!
//! ```text
//! stage / steward ── publish(Event) ──► Bus ──► pipeline listener ──► SubscriberSet
//!                                                                 ┌──────┼──────┐
//!                                                                 ▼      ▼      ▼
//!                                                           LogWriter Metrics Custom
//! ```
//!
//! - [`Subscribe`] the trait to implement
//! - [`SubscriberSet`] per-subscriber queues and workers
//! - `LogWriter` (feature `logging`) forwards events to `tracing`

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
