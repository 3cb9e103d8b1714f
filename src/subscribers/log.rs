//! # LogWriter: runtime events as `tracing` records
//!
//! A subscriber that turns every [`Event`] into one structured `tracing` record.
//! Failures and unhealthy wards are logged at `WARN`, restarts at `INFO`, routine
//! lifecycle at `DEBUG`. Install any `tracing` subscriber (e.g. `tracing-subscriber`
//! with `RUST_LOG=pipevisor=debug`) to see them.
//!
//! ## Example output
//! ```text
//! DEBUG pipevisor: stage starting stage="prime-finder" id=4
//!  WARN pipevisor: stage failed stage="decode" id=7 reason="bad header"
//!  WARN pipevisor: ward missed its heartbeat steward="watchdog" attempt=2 timeout_ms=4000
//!  INFO pipevisor: restart scheduled steward="watchdog" attempt=2 delay_ms=250
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let stage = e.stage.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::StageStarting => {
                debug!(target: "pipevisor", stage, id = e.stage_id, "stage starting");
            }
            EventKind::StageStopped => {
                debug!(target: "pipevisor", stage, id = e.stage_id, reason, "stage stopped");
            }
            EventKind::StageFailed => {
                warn!(target: "pipevisor", stage, id = e.stage_id, reason, "stage failed");
            }
            EventKind::WorkerFailed => {
                warn!(target: "pipevisor", stage, worker = e.worker, reason, "fan-out worker failed");
            }
            EventKind::WardStarting => {
                debug!(target: "pipevisor", steward = stage, attempt = e.attempt, "ward starting");
            }
            EventKind::WardUnhealthy => {
                warn!(
                    target: "pipevisor",
                    steward = stage,
                    attempt = e.attempt,
                    timeout_ms = e.timeout_ms,
                    "ward missed its heartbeat"
                );
            }
            EventKind::WardExited => {
                warn!(target: "pipevisor", steward = stage, attempt = e.attempt, "ward exited; restarting");
            }
            EventKind::RestartScheduled => {
                info!(
                    target: "pipevisor",
                    steward = stage,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    "restart scheduled"
                );
            }
            EventKind::WardExhausted => {
                warn!(target: "pipevisor", steward = stage, attempt = e.attempt, reason, "ward exhausted");
            }
            EventKind::StewardStopped => {
                debug!(target: "pipevisor", steward = stage, attempt = e.attempt, "steward stopped");
            }
            EventKind::ShutdownRequested => info!(target: "pipevisor", "shutdown requested"),
            EventKind::AllStoppedWithin => info!(target: "pipevisor", "all stages stopped within grace"),
            EventKind::GraceExceeded => warn!(target: "pipevisor", "grace exceeded"),
            EventKind::SubscriberOverflow => {
                warn!(target: "pipevisor", subscriber = stage, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "pipevisor", subscriber = stage, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
