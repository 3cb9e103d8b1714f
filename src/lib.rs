//! # pipevisor
//!
//! **Pipevisor** is a small library of cancellable async pipelines for Rust.
//!
//! It provides stages that hand typed, bounded sequences to each other, fan-out and
//! fan-in combinators, heartbeats that report worker liveness, and a self-healing
//! [`Steward`] that restarts whatever stops pulsing. Every stage observes one
//! cancellation token at every blocking point, so cancelling it drains the whole graph.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  Pipeline (cheap clone: token + shared runtime)
//!     │
//!     ├─► source("gen") ─► Sequence<T> ─► map("parse") ─► Sequence<U> ─► fan_out("work", k)
//!     │        │                              │                              │
//!     │        ▼                              ▼                              ▼
//!     │   Emitter::emit ◄── select(token) ── recv_or_cancel          JoinSet of k workers
//!     │
//!     ├─► with_heartbeat("job", mode) ─► (Heartbeat, Sequence<T>)
//!     │
//!     └─► supervise("steward", timeout, ward)
//!              │ start(or(steward, fresh), timeout / 2)
//!              ▼
//!           Ward ── Heartbeat ──► Steward ── quiet for `timeout` ──► cancel + restart
//!
//! Every worker ── publish(Event) ──► Bus ──► listener ──► AliveTracker
//!                                                    └─► SubscriberSet ─► Subscribe::on_event
//! ```
//!
//! ### Lifecycle of a stage
//! ```text
//! spawn_stage(name, worker)
//!   ├─► publish StageStarting{ stage, stage_id }
//!   ├─► worker runs on the pipeline's TaskTracker
//!   │       ├─ Ok / Canceled / Closed  ─► publish StageStopped
//!   │       ├─ Err(Fail | Conversion)  ─► publish StageFailed{ reason }
//!   │       └─ panic                   ─► publish StageFailed{ reason = panic }
//!   └─► emitter dropped ─► output sequence closes (consumers see the end)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Stages**        | Producers, transforms, generators, type-erasure boundary.     | [`Pipeline`], [`Sequence`], [`Emitter`]     |
//! | **Fan-out/in**    | Bounded worker pools and merges with a closure guarantee.     | [`Pipeline::fan_out`], [`Pipeline::fan_in`] |
//! | **Cancellation**  | Composite tokens and or-done relays.                          | [`cancel::or`], [`Pipeline::or_done`]       |
//! | **Heartbeats**    | Interval and work-start liveness signals.                     | [`HeartbeatMode`], [`Beating`], [`Heartbeat`] |
//! | **Supervision**   | Restart wards that stop pulsing, with backoff and give-up.    | [`Steward`], [`Ward`], [`StewardPolicy`]    |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, alerting).      | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for stages and runtime shutdown.                 | [`StageError`], [`RuntimeError`]            |
//! | **Configuration** | Centralize runtime settings.                                  | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber that writes events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use pipevisor::{Config, Pipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn pipevisor::Subscribe>> = vec![Arc::new(pipevisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn pipevisor::Subscribe>> = Vec::new();
//!
//!     let pipeline = Pipeline::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let numbers = pipeline.generator("numbers", 1..=10u64);
//!     let squares = pipeline.fan_out("square", numbers, 4, |n| async move { Ok(n * n) });
//!     let total: u64 = squares.collect_all().await.into_iter().sum();
//!     assert_eq!(total, 385);
//!
//!     pipeline.shutdown().await?;
//!     Ok(())
//! }
//! ```
pub mod cancel;
mod core;
mod error;
mod events;
mod policies;
mod sequence;
mod stages;
mod steward;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, Pipeline, PipelineBuilder};
pub use error::{RuntimeError, StageError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, StewardPolicy};
pub use sequence::{Emitter, Heartbeat, Liveness, Pulse, Pulser, Sequence, channel, pulse_channel};
pub use stages::{Beating, Erased, HeartbeatMode};
pub use steward::{Steward, Ward, WardFn, WardRef};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tokio_util::sync::CancellationToken;

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
