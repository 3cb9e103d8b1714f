//! # Heartbeat stages.
//!
//! [`Pipeline::with_heartbeat`] spawns a stage that hands its worker a [`Beating`]
//! instead of a bare [`Emitter`]. The worker performs all of its waits through it, and
//! the pulses come from those waits:
//!
//! ```text
//! HeartbeatMode::Interval(p)
//!   Beating::emit / recv / sleep ──select──► ticker (every p) ─► Pulser::pulse()
//!                                      └──► the actual wait
//!
//! HeartbeatMode::WorkStart
//!   Beating::emit(item) ─► Pulser::pulse() ─► Emitter::emit(item)
//! ```
//!
//! ## Rules
//! - Pulses never block: a full buffer or a gone observer drops the pulse
//! - A worker stuck outside a `Beating` wait stops pulsing; that is the signal an
//!   observer (usually a [`Steward`](crate::Steward)) acts on
//! - The heartbeat closes when the worker ends, like its output sequence
//! - The interval ticker starts at the first wait, so startup work before it does not
//!   produce a burst of stale ticks

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::Pipeline;
use crate::error::StageError;
use crate::sequence::{self, Emitter, Heartbeat, Pulser, Sequence};

/// When a heartbeat stage pulses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatMode {
    /// Pulse every period while the worker waits inside [`Beating`].
    ///
    /// A zero period is raised to one millisecond.
    Interval(Duration),
    /// Pulse once right before each item is handed downstream.
    WorkStart,
}

/// The worker's side of a heartbeat stage: an emitter that pulses.
pub struct Beating<U> {
    out: Emitter<U>,
    pulser: Pulser,
    mode: HeartbeatMode,
    ticker: Option<Interval>,
}

impl<U> Beating<U> {
    fn new(out: Emitter<U>, pulser: Pulser, mode: HeartbeatMode) -> Self {
        Self {
            out,
            pulser,
            mode,
            ticker: None,
        }
    }

    /// Sends `item` downstream, pulsing according to the mode while it waits.
    ///
    /// ### Errors
    /// Same as [`Emitter::emit`].
    pub async fn emit(&mut self, item: U) -> Result<(), StageError> {
        if self.mode == HeartbeatMode::WorkStart {
            self.pulser.pulse();
            return self.out.emit(item).await;
        }
        let Self {
            out,
            pulser,
            mode,
            ticker,
        } = self;
        beating_while(*mode, ticker, pulser, out.emit(item)).await
    }

    /// Receives the next upstream item, pulsing while it waits.
    ///
    /// Returns `None` on end of input or cancellation.
    pub async fn recv<T>(&mut self, input: &mut Sequence<T>) -> Option<T> {
        let token = self.out.token().clone();
        beating_while(self.mode, &mut self.ticker, &self.pulser, input.recv_or_cancel(&token)).await
    }

    /// Sleeps for `duration`, pulsing while it waits.
    ///
    /// ### Errors
    /// [`StageError::Canceled`] if the token fires first.
    pub async fn sleep(&mut self, duration: Duration) -> Result<(), StageError> {
        let token = self.out.token().clone();
        let wait = async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(StageError::Canceled),
                _ = time::sleep(duration) => Ok(()),
            }
        };
        beating_while(self.mode, &mut self.ticker, &self.pulser, wait).await
    }

    /// Sends a pulse right now.
    pub fn pulse(&self) -> bool {
        self.pulser.pulse()
    }

    /// The token this stage observes.
    pub fn token(&self) -> &CancellationToken {
        self.out.token()
    }
}

impl Pipeline {
    /// Spawns a stage whose worker reports liveness through a [`Heartbeat`].
    ///
    /// Returns the heartbeat and the stage's output sequence; both close when the worker
    /// ends.
    pub fn with_heartbeat<U, F, Fut>(
        &self,
        name: &str,
        mode: HeartbeatMode,
        f: F,
    ) -> (Heartbeat, Sequence<U>)
    where
        U: Send + 'static,
        F: FnOnce(Beating<U>) -> Fut,
        Fut: Future<Output = Result<(), StageError>> + Send + 'static,
    {
        let (pulser, heartbeat) = sequence::pulse_channel();
        let (out, seq) =
            sequence::channel(self.token().clone(), self.config().sequence_capacity_clamped());
        self.spawn_stage(name, f(Beating::new(out, pulser, mode)));
        (heartbeat, seq)
    }
}

/// Drives `wait` to completion, pulsing on every interval tick meanwhile.
async fn beating_while<R>(
    mode: HeartbeatMode,
    ticker: &mut Option<Interval>,
    pulser: &Pulser,
    wait: impl Future<Output = R>,
) -> R {
    let HeartbeatMode::Interval(period) = mode else {
        return wait.await;
    };
    let ticker = ticker.get_or_insert_with(|| {
        let period = period.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    tokio::pin!(wait);
    loop {
        tokio::select! {
            biased;
            res = &mut wait => return res,
            _ = ticker.tick() => {
                pulser.pulse();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Liveness};

    fn pipeline() -> Pipeline {
        Pipeline::new(Config::default())
    }

    #[tokio::test(start_paused = true)]
    async fn work_start_pulses_before_each_item() {
        let p = pipeline();
        let (mut hb, mut out) = p.with_heartbeat("work", HeartbeatMode::WorkStart, |mut beat| async move {
            for n in [10u8, 20] {
                beat.emit(n).await?;
            }
            Ok(())
        });

        assert_eq!(hb.recv().await, Some(crate::Pulse));
        assert_eq!(out.recv().await, Some(10));
        assert_eq!(out.recv().await, Some(20));
        assert_eq!(out.recv().await, None);
        // The pulse for the second item may have been dropped, but the channel closes.
        while hb.recv().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn interval_heartbeat_never_times_out_under_normal_operation() {
        let p = pipeline();
        let period = Duration::from_millis(100);
        let timeout = Config::heartbeat_timeout(period);

        for trial in 0..1000 {
            let scope = p.child();
            let (mut hb, mut out) = scope.with_heartbeat(
                "ticker",
                HeartbeatMode::Interval(period),
                move |mut beat| async move {
                    let mut n = 0u32;
                    loop {
                        beat.sleep(period / 3).await?;
                        beat.emit(n).await?;
                        n += 1;
                    }
                },
            );

            for _ in 0..3 {
                assert_eq!(hb.observe(timeout).await, Liveness::Pulse, "trial {trial}");
                while out.try_recv().is_some() {}
            }
            scope.cancel();
            let mut last = hb.observe(timeout).await;
            while last == Liveness::Pulse {
                last = hb.observe(timeout).await;
            }
            assert_eq!(last, Liveness::Closed, "trial {trial}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_worker_stops_pulsing() {
        let p = pipeline();
        let period = Duration::from_millis(50);
        let (mut hb, _out) = p.with_heartbeat::<u8, _, _>(
            "stuck",
            HeartbeatMode::Interval(period),
            move |mut beat| async move {
                beat.sleep(period * 3).await?;
                // Blocks outside of any `Beating` wait.
                beat.token().cancelled().await;
                Ok(())
            },
        );

        let timeout = Config::heartbeat_timeout(period);
        assert_eq!(hb.observe(timeout).await, Liveness::Pulse);
        loop {
            match hb.observe(timeout).await {
                Liveness::Pulse => continue,
                other => {
                    assert_eq!(other, Liveness::TimedOut);
                    break;
                }
            }
        }
        p.cancel();
    }
}
