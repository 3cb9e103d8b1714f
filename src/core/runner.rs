//! # Stage runner: spawn one worker and report how it ended.
//!
//! Every stage constructor funnels its worker future through [`Pipeline::spawn_stage`]:
//!
//! ```text
//! spawn_stage(name, fut)
//!   ├─ allocate stage_id
//!   ├─ publish StageStarting
//!   └─ tracker.spawn:
//!        fut.catch_unwind()
//!          ├─ Ok(Ok(()))                       → StageStopped
//!          ├─ Ok(Err(Canceled | Closed))       → StageStopped (reason = label)
//!          ├─ Ok(Err(Fail | Conversion | ..))  → StageFailed  (reason = message)
//!          └─ Err(panic payload)               → StageFailed  (reason = panic message)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per stage
//! - `StageStarting` is published before the worker is polled
//! - The worker's emitter lives inside `fut`, so the output sequence closes on every
//!   exit path, unwinding included

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::pipeline::Pipeline;
use crate::error::{StageError, panic_message};
use crate::events::{Bus, Event, EventKind};

impl Pipeline {
    /// Spawns `fut` as the worker of stage `name` on the pipeline's task tracker.
    ///
    /// Returns the stage id carried by every lifecycle event of this worker.
    pub(crate) fn spawn_stage<F>(&self, name: &str, fut: F) -> u64
    where
        F: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        let id = self.next_stage_id();
        let name: Arc<str> = Arc::from(name);
        let bus = self.bus().clone();

        bus.publish(
            Event::new(EventKind::StageStarting)
                .with_stage(Arc::clone(&name))
                .with_stage_id(id),
        );

        self.tracker().spawn(async move {
            let res = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(StageError::Panicked {
                    info: panic_message(payload.as_ref()),
                }),
            };
            report(&bus, name, id, &res);
        });
        id
    }
}

/// Publishes the terminal event for one stage worker.
fn report(bus: &Bus, name: Arc<str>, id: u64, res: &Result<(), StageError>) {
    match res {
        Ok(()) => {
            tracing::debug!(stage = %name, id, "stage finished");
            bus.publish(
                Event::new(EventKind::StageStopped)
                    .with_stage(name)
                    .with_stage_id(id),
            );
        }
        Err(e) if e.is_graceful() => {
            tracing::debug!(stage = %name, id, reason = e.as_label(), "stage stopped");
            bus.publish(
                Event::new(EventKind::StageStopped)
                    .with_stage(name)
                    .with_stage_id(id)
                    .with_reason(e.as_label()),
            );
        }
        Err(e) => {
            tracing::debug!(stage = %name, id, error = %e, "stage failed");
            bus.publish(
                Event::new(EventKind::StageFailed)
                    .with_stage(name)
                    .with_stage_id(id)
                    .with_reason(e.as_message()),
            );
        }
    }
}
