//! # Runtime events emitted by stages, fan-out workers and stewards.
//!
//! The [`EventKind`] enum classifies events in four groups:
//! - **Stage lifecycle**: a stage worker started, stopped, or failed
//! - **Supervision**: ward started, found unhealthy, exited, restarted, given up on
//! - **Shutdown**: shutdown requested, finished within grace, grace exceeded
//! - **Subscriber health**: overflowing or panicking subscribers
//!
//! The bus is the error side channel of the pipeline: a stage that fails closes its
//! output sequence and reports *why* here, never on the data path.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pipevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StageFailed)
//!     .with_stage("decode")
//!     .with_reason("bad header")
//!     .with_worker(3);
//!
//! assert_eq!(ev.kind, EventKind::StageFailed);
//! assert_eq!(ev.stage.as_deref(), Some("decode"));
//! assert_eq!(ev.worker, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `stage` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event because its queue was full or closed.
    ///
    /// Sets `stage` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Shutdown events ===
    /// [`Pipeline::shutdown`](crate::Pipeline::shutdown) was called or a signal arrived.
    ShutdownRequested,

    /// Every tracked worker stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers were still running.
    GraceExceeded,

    // === Stage lifecycle ===
    /// A stage worker was spawned.
    ///
    /// Sets `stage`, `stage_id`.
    StageStarting,

    /// A stage worker ended cleanly (ran out of input, was cancelled, or lost its consumer).
    ///
    /// Sets `stage`, `stage_id`, and `reason` for cancellation/closed endings.
    StageStopped,

    /// A stage worker ended with a terminal error; its output sequence is closed.
    ///
    /// Sets `stage`, `stage_id`, `reason`.
    StageFailed,

    /// One fan-out worker failed; the remaining workers keep going.
    ///
    /// Sets `stage`, `stage_id`, `worker`, `reason`.
    WorkerFailed,

    // === Supervision ===
    /// A steward started (or restarted) its ward.
    ///
    /// Sets `stage` (steward name), `attempt` (1-based ward instance), `timeout_ms`.
    WardStarting,

    /// No pulse arrived from the ward within the steward timeout.
    ///
    /// Sets `stage`, `attempt`, `timeout_ms`.
    WardUnhealthy,

    /// The ward closed its heartbeat (it exited on its own).
    ///
    /// Sets `stage`, `attempt`.
    WardExited,

    /// A replacement ward will be started after `delay_ms`.
    ///
    /// Sets `stage`, `attempt` (the instance being replaced), `delay_ms`.
    RestartScheduled,

    /// The steward exceeded `max_restarts` and stopped supervising.
    ///
    /// Sets `stage`, `attempt`, `reason`.
    WardExhausted,

    /// The steward's own token fired; it cancelled its ward and exited.
    ///
    /// Sets `stage`, `attempt`.
    StewardStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the stage, steward or subscriber the event is about.
    pub stage: Option<Arc<str>>,
    /// Unique id of the stage worker (distinguishes restarts of a same-named stage).
    pub stage_id: Option<u64>,
    /// Fan-out worker index.
    pub worker: Option<u32>,
    /// Ward instance number (starting from 1).
    pub attempt: Option<u32>,
    /// Steward timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Restart delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            stage: None,
            stage_id: None,
            worker: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a stage (or steward/subscriber) name.
    #[inline]
    pub fn with_stage(mut self, stage: impl Into<Arc<str>>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Attaches the unique stage worker id.
    #[inline]
    pub fn with_stage_id(mut self, id: u64) -> Self {
        self.stage_id = Some(id);
        self
    }

    /// Attaches a fan-out worker index.
    #[inline]
    pub fn with_worker(mut self, worker: u32) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches a ward instance number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_stage(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_stage(subscriber)
            .with_reason(info)
    }

    /// Returns `true` for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::StageStarting);
        let b = Event::new(EventKind::StageStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_saturate_at_u32_millis() {
        let ev = Event::new(EventKind::RestartScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
