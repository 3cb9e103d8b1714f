//! # Stages: the building blocks of a pipeline.
//!
//! A stage owns exactly one newly created output [`Sequence`] and exactly one worker
//! that fills it through an [`Emitter`]. Constructors are methods on [`Pipeline`]:
//!
//! ```text
//! source(name, |out| ..)            ─► Sequence<U>
//! stage(name, input, |in, out| ..)  ─► Sequence<U>
//!   ├─ map / try_map / filter / take         (transform.rs)
//!   ├─ generator / repeat / repeat_fn        (generators.rs)
//!   ├─ erase / downcast                      (erased.rs)
//!   ├─ or_done / tee / bridge                (combinators.rs)
//!   ├─ fan_out / fan_in                      (fan.rs)
//!   └─ with_heartbeat                        (heartbeat.rs)
//! ```
//!
//! ## Rules
//! - Every worker is spawned through the runner: one `StageStarting` and exactly one
//!   `StageStopped` / `StageFailed` per stage on the event bus
//! - Every blocking point observes the pipeline token: [`Emitter::emit`] for sends,
//!   [`Sequence::recv_or_cancel`] for receives
//! - Returning `Err(StageError::Canceled | Closed)` is a graceful stop, any other
//!   error is reported as `StageFailed`; consumers only see the sequence end
//! - Order is preserved by every 1:1 stage

mod combinators;
mod erased;
mod fan;
mod generators;
mod heartbeat;
mod transform;

pub use erased::Erased;
pub use heartbeat::{Beating, HeartbeatMode};

use std::future::Future;

use crate::core::Pipeline;
use crate::error::StageError;
use crate::sequence::{self, Emitter, Sequence};

impl Pipeline {
    /// Spawns a producer stage with the default output capacity.
    ///
    /// # Example
    /// ```rust
    /// use pipevisor::{Config, Pipeline};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let pipeline = Pipeline::new(Config::default());
    /// let numbers = pipeline.source("numbers", |out| async move {
    ///     for n in 0..3u32 {
    ///         out.emit(n).await?;
    ///     }
    ///     Ok(())
    /// });
    /// assert_eq!(numbers.collect_all().await, vec![0, 1, 2]);
    /// # }
    /// ```
    pub fn source<U, F, Fut>(&self, name: &str, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnOnce(Emitter<U>) -> Fut,
        Fut: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        self.source_with_capacity(name, self.config().sequence_capacity_clamped(), f)
    }

    /// Spawns a producer stage whose output buffers up to `capacity` items.
    pub fn source_with_capacity<U, F, Fut>(&self, name: &str, capacity: usize, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnOnce(Emitter<U>) -> Fut,
        Fut: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        let (out, seq) = sequence::channel(self.token().clone(), capacity);
        self.spawn_stage(name, f(out));
        seq
    }

    /// Spawns a transform stage reading `input` with the default output capacity.
    ///
    /// The worker should read with [`Sequence::recv_or_cancel`] so it stops promptly.
    pub fn stage<T, U, F, Fut>(&self, name: &str, input: Sequence<T>, f: F) -> Sequence<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(Sequence<T>, Emitter<U>) -> Fut,
        Fut: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        self.stage_with_capacity(name, input, self.config().sequence_capacity_clamped(), f)
    }

    /// Spawns a transform stage whose output buffers up to `capacity` items.
    pub fn stage_with_capacity<T, U, F, Fut>(
        &self,
        name: &str,
        input: Sequence<T>,
        capacity: usize,
        f: F,
    ) -> Sequence<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(Sequence<T>, Emitter<U>) -> Fut,
        Fut: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        let (out, seq) = sequence::channel(self.token().clone(), capacity);
        self.spawn_stage(name, f(input, out));
        seq
    }
}
