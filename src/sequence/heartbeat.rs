//! # Heartbeat sequences.
//!
//! A heartbeat is a capacity-1 sequence of [`Pulse`]s, separate from data, that lets an
//! observer tell "slow but alive" from "stuck".
//!
//! ## Rules
//! - **Lossy**: [`Pulser::pulse`] uses `try_send`; if the one-slot buffer is full or
//!   nobody listens, the pulse is dropped. It never blocks the worker.
//! - **One slot**: a reader that arrives late still sees the most recent undelivered pulse.
//! - **Closed on exit**: dropping the pulser closes the heartbeat; observers see
//!   [`Liveness::Closed`].

use std::time::Duration;

use tokio::sync::mpsc;

/// A unit liveness signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pulse;

/// What an observer learned while waiting on a heartbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// A pulse arrived in time.
    Pulse,
    /// The worker exited and closed its heartbeat.
    Closed,
    /// Nothing arrived within the timeout; the worker is presumed unhealthy.
    TimedOut,
}

/// Creates a connected pulser/heartbeat pair.
pub fn pulse_channel() -> (Pulser, Heartbeat) {
    let (tx, rx) = mpsc::channel(1);
    (Pulser { tx }, Heartbeat { rx })
}

/// Sending half of a heartbeat, owned by the monitored worker.
#[derive(Clone, Debug)]
pub struct Pulser {
    tx: mpsc::Sender<Pulse>,
}

impl Pulser {
    /// Attempts to deliver a pulse without waiting.
    ///
    /// Returns `true` if the pulse was buffered, `false` if it was dropped.
    pub fn pulse(&self) -> bool {
        self.tx.try_send(Pulse).is_ok()
    }
}

/// Receiving half of a heartbeat.
#[derive(Debug)]
pub struct Heartbeat {
    rx: mpsc::Receiver<Pulse>,
}

impl Heartbeat {
    /// Waits for the next pulse; `None` once the worker closed the heartbeat.
    pub async fn recv(&mut self) -> Option<Pulse> {
        self.rx.recv().await
    }

    /// Waits for a pulse for at most `timeout`.
    ///
    /// Use a timeout strictly greater than the pulse interval; twice the interval
    /// absorbs scheduling jitter.
    pub async fn observe(&mut self, timeout: Duration) -> Liveness {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(Pulse)) => Liveness::Pulse,
            Ok(None) => Liveness::Closed,
            Err(_elapsed) => Liveness::TimedOut,
        }
    }

    /// Returns a pending pulse if there is one.
    pub fn try_recv(&mut self) -> Option<Pulse> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pulse_never_blocks_and_keeps_one() {
        let (pulser, mut hb) = pulse_channel();
        assert!(pulser.pulse());
        assert!(!pulser.pulse());
        assert!(!pulser.pulse());
        assert_eq!(hb.try_recv(), Some(Pulse));
        assert_eq!(hb.try_recv(), None);
    }

    #[tokio::test]
    async fn pulse_without_listener_is_dropped() {
        let (pulser, hb) = pulse_channel();
        drop(hb);
        assert!(!pulser.pulse());
    }

    #[tokio::test(start_paused = true)]
    async fn observe_reports_each_outcome() {
        let (pulser, mut hb) = pulse_channel();
        assert_eq!(hb.observe(Duration::from_secs(1)).await, Liveness::TimedOut);

        pulser.pulse();
        assert_eq!(hb.observe(Duration::from_secs(1)).await, Liveness::Pulse);

        drop(pulser);
        assert_eq!(hb.observe(Duration::from_secs(1)).await, Liveness::Closed);
    }
}
